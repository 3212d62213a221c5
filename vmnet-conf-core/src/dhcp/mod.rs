//! `dhcpd.conf` parsing: scope tree, keyword interpretation and inheritance.

use std::io::Read;

use thiserror::Error;
use tracing::debug;

use crate::filter::{consume, strip_comments, CommentEnd};
use crate::token::{tokenize, DHCP_CONFIG};

mod declaration;
mod param;
mod resolve;
mod tree;

pub use declaration::{Declaration, DeclarationId, DeclarationTree};
pub use param::{ClientMatch, Grant, Parameter};
pub use resolve::{ConfigDeclaration, DhcpConfiguration};
pub use tree::{parse_scopes, Scope, ScopeTree, Statement};

/// Errors raised while parsing or querying a DHCP configuration.
#[derive(Debug, Error)]
pub enum DhcpConfigError {
    /// Failed to read the configuration handle.
    #[error("failed to read DHCP configuration: {0}")]
    Io(#[from] std::io::Error),
    /// A `}` appeared with no open scope.
    #[error("cannot close global declaration")]
    CloseGlobal,
    /// Tokens were left without a `;` or `{` to terminate them.
    #[error("list of tokens was left unterminated: {tokens:?}")]
    Unterminated { tokens: Vec<String> },
    /// Input ended inside a scope.
    #[error("declaration {scope} was never closed")]
    Unclosed { scope: String },
    #[error("invalid parameter {keyword} {operands:?}: {reason}")]
    Parameter {
        keyword: String,
        operands: Vec<String>,
        reason: String,
    },
    #[error("invalid declaration {keyword} {operands:?}: {reason}")]
    Declaration {
        keyword: String,
        operands: Vec<String>,
        reason: String,
    },
    #[error("no {kind} declaration matched {needle}")]
    NoMatch { kind: &'static str, needle: String },
    #[error("more than one {kind} declaration matched {needle}: {}", .found.join(", "))]
    Ambiguous {
        kind: &'static str,
        needle: String,
        found: Vec<String>,
    },
    #[error("no {0} address was found")]
    MissingAddress(&'static str),
    #[error("more than one {family} address was found: {}", .found.join(", "))]
    MultipleAddresses {
        family: &'static str,
        found: Vec<String>,
    },
    #[error("unable to resolve host {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read a DHCP configuration from `reader` and resolve every declaration.
pub fn read_dhcp_config<R: Read>(reader: R) -> Result<DhcpConfiguration, DhcpConfigError> {
    let bytes = consume(reader)?;
    let tokens = tokenize(strip_comments(bytes, CommentEnd::Consume), &DHCP_CONFIG);
    let scopes = parse_scopes(tokens)?;
    let tree = DeclarationTree::interpret(&scopes)?;
    debug!(declarations = tree.len(), "interpreted DHCP configuration");
    Ok(DhcpConfiguration::flatten(&tree))
}

/// Parse an in-memory DHCP configuration.
pub fn parse_dhcp_config(input: &[u8]) -> Result<DhcpConfiguration, DhcpConfigError> {
    read_dhcp_config(input)
}
