use thiserror::Error;

pub mod auth;
pub mod category;
pub mod task;
pub mod user;

#[cfg(test)]
pub(crate) mod test_util;

/// Failure from a driven port write which the domain may want to react to, rather than
/// just propagate. Writes that can't trip over a store constraint return [anyhow::Error] instead.
#[derive(Error, Debug)]
pub enum DrivenPortError {
    #[error("a communication failure occurred: {0}")]
    CommsFailure(#[from] anyhow::Error),
    #[error("the write collided with a uniqueness constraint")]
    Conflict,
    #[error("the write referenced data that does not exist")]
    DoesNotExist,
}

/// Confirmation returned by operations which have nothing else to report
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Acknowledgement {
    pub message: String,
}

impl Acknowledgement {
    pub fn new(message: &str) -> Self {
        Acknowledgement {
            message: message.to_owned(),
        }
    }
}
