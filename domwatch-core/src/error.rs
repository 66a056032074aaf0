/// Errors produced by the `domwatch-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// The name of the domain to supervise was empty.
    #[error("domain name must not be empty")]
    EmptyDomainName,

    /// Restart is enabled but no creation config file was supplied.
    #[error("a domain config file is required when restart is enabled")]
    MissingConfigFile,

    /// A domain id string could not be parsed.
    #[error("invalid domain id '{value}': {reason}")]
    InvalidDomainId { value: String, reason: String },
}
