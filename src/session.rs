use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::{ExtractError, SessionError};
use crate::model::{FieldDescriptor, FieldIssue, FieldValue};
use crate::schema::SchemaExtractor;
use crate::validation::validate_field;

/// Issued by [`FormSession::begin_load`]; only the newest ticket may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Empty,
    Loading,
    Ready {
        fields: Vec<FieldDescriptor>,
        values: BTreeMap<String, FieldValue>,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Default)]
pub struct FormSession {
    generation: u64,
    state: SessionState,
}

impl FormSession {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = SessionState::Loading;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Applies an extraction result if `ticket` is still the newest load.
    /// Returns `false` for superseded results, which are dropped.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<FieldDescriptor>, ExtractError>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping superseded form load"
            );
            return false;
        }

        self.state = match result {
            Ok(fields) => {
                let values = fields
                    .iter()
                    .map(|field| (field.name.clone(), field.initial_value()))
                    .collect();
                SessionState::Ready { fields, values }
            }
            Err(err) => {
                warn!(error = %err, "form load failed");
                SessionState::Failed {
                    message: err.to_string(),
                }
            }
        };
        true
    }

    pub fn load(&mut self, extractor: &SchemaExtractor, raw: &str) -> bool {
        let ticket = self.begin_load();
        self.complete_load(ticket, extractor.extract(raw))
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.state {
            SessionState::Ready { fields, .. } => fields.as_slice(),
            _ => &[],
        }
    }

    pub fn values(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match &self.state {
            SessionState::Ready { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values().and_then(|values| values.get(name))
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed { message } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|field| field.name == name)
    }

    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<(), SessionError> {
        let SessionState::Ready { values, .. } = &mut self.state else {
            return Err(SessionError::NotReady);
        };

        match values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(SessionError::UnknownField(name.to_string())),
        }
    }

    pub fn validate(&self) -> Vec<FieldIssue> {
        self.fields()
            .iter()
            .flat_map(|field| {
                self.value(&field.name)
                    .map(|value| validate_field(field, value))
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |message| FieldIssue {
                        field: field.name.clone(),
                        message,
                    })
            })
            .collect()
    }
}
