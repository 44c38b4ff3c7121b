mod error;
pub use error::{
    AssertionParseError, AuthenticationError, Error, ExchangeError, ExchangeErrorKind, Result,
    SignOnStep,
};

pub mod config;

pub mod assertion;
pub mod credentials;
pub mod idp;
pub mod role;
pub mod sts;

pub mod federation;

pub mod credentials_file;
pub mod prompt;

pub mod cmd;
