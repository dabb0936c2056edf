use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("library database error")]
    Database,
    #[display("library location error")]
    Storage,
    #[display("scan failed")]
    Scan,
    /// The library root couldn't be reached; the user needs to mount or
    /// select it again.
    #[display("{_0}")]
    Reconnect(#[error(not(source))] String),
}
