//! Constraint validation against a backend vocabulary

use std::collections::{BTreeMap, BTreeSet};

use crate::constraints::{ConstraintName, ConstraintSet};
use crate::error::{ProvisionError, Result};

/// Registry of what a backend can honor
///
/// A constraint name is in exactly one of three states: unsupported,
/// restricted to a vocabulary, or unrestricted.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    unsupported: BTreeSet<ConstraintName>,
    vocabulary: BTreeMap<ConstraintName, BTreeSet<String>>,
}

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    /// The request with unsupported constraints stripped
    pub effective: ConstraintSet,

    /// Constraints that were set but stripped, in name order
    pub unsupported: Vec<ConstraintName>,
}

impl Validated {
    /// Refuse any unsupported constraint instead of stripping it.
    pub fn strict(self) -> Result<ConstraintSet> {
        match self.unsupported.first() {
            Some(name) => Err(ProvisionError::UnsupportedConstraint(name.to_string())),
            None => Ok(self.effective),
        }
    }

    pub fn warnings(&self) -> Vec<ProvisionError> {
        self.unsupported
            .iter()
            .map(|name| ProvisionError::UnsupportedConstraint(name.to_string()))
            .collect()
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark constraints this backend can never honor.
    pub fn register_unsupported<I>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = ConstraintName>,
    {
        for name in names {
            if self.vocabulary.contains_key(&name) {
                return Err(ProvisionError::ConflictingRegistration(name.to_string()));
            }
            self.unsupported.insert(name);
        }
        Ok(())
    }

    /// Restrict the values accepted for `name`.
    ///
    /// Registering a vocabulary again replaces the previous one.
    pub fn register_vocabulary<I, S>(&mut self, name: ConstraintName, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.unsupported.contains(&name) {
            return Err(ProvisionError::ConflictingRegistration(name.to_string()));
        }
        self.vocabulary
            .insert(name, values.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub fn is_unsupported(&self, name: ConstraintName) -> bool {
        self.unsupported.contains(&name)
    }

    pub fn vocabulary(&self, name: ConstraintName) -> Option<&BTreeSet<String>> {
        self.vocabulary.get(&name)
    }

    /// Check `cons` against the registered vocabulary.
    ///
    /// Values outside a vocabulary are a hard error. Unsupported constraints
    /// are stripped from the effective set and reported in
    /// [`Validated::unsupported`].
    pub fn validate(&self, cons: &ConstraintSet) -> Result<Validated> {
        for (name, allowed) in &self.vocabulary {
            for value in cons.values(*name) {
                if !allowed.contains(&value) {
                    return Err(ProvisionError::InvalidConstraintValue {
                        name: name.to_string(),
                        value,
                        allowed: allowed.iter().cloned().collect(),
                    });
                }
            }
        }

        let mut effective = cons.clone();
        let mut unsupported = Vec::new();
        for name in &self.unsupported {
            if cons.has(*name) {
                tracing::debug!("Dropping unsupported constraint: {}", name);
                effective = effective.without(*name);
                unsupported.push(*name);
            }
        }

        Ok(Validated {
            effective,
            unsupported,
        })
    }
}
