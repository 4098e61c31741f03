use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("failed to list ingresses: {0}")]
    ListIngresses(#[source] kube::Error),

    #[error("failed to list {kind} resources: {source}")]
    ListResources {
        kind: &'static str,
        #[source]
        source: kube::Error,
    },

    #[error("failed to {op} {kind} {name}: {source}")]
    Write {
        op: Operation,
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("default backend was redefined in ingress {namespace}/{name}, ignoring")]
    DefaultBackendConflict { namespace: String, name: String },
}

impl CoreError {
    /// Conflicts are reported but never abort a pass
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CoreError::DefaultBackendConflict { .. })
    }
}

/// Store write performed by the reconciler
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
