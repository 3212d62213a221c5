use std::fmt::{self, Display, Formatter};

use crate::token::Token;

use super::DhcpConfigError;

/// A keyword followed by its operands, as written before a `;` or `{`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statement {
    pub name: String,
    pub operands: Vec<String>,
}

impl Statement {
    fn from_tokens(tokens: Vec<String>) -> Self {
        let mut iter = tokens.into_iter();
        let name = iter.next().unwrap_or_default();
        Self {
            name,
            operands: iter.collect(),
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.operands.join(","))
    }
}

/// One `{ ... }` scope before keyword interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Statement that opened the scope; empty for the implicit root.
    pub header: Statement,
    pub parent: Option<usize>,
    pub statements: Vec<Statement>,
    pub children: Vec<usize>,
}

/// Scopes stored in an arena; index 0 is the implicit global scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTree {
    pub scopes: Vec<Scope>,
}

impl ScopeTree {
    pub const ROOT: usize = 0;
}

/// Build the scope tree from a DHCP-config token stream.
pub fn parse_scopes<I>(tokens: I) -> Result<ScopeTree, DhcpConfigError>
where
    I: IntoIterator<Item = Token>,
{
    let mut scopes = vec![Scope::default()];
    let mut cursor = ScopeTree::ROOT;
    let mut pending: Vec<String> = Vec::new();

    for token in tokens {
        match token {
            Token::Symbol('{') => {
                let index = scopes.len();
                scopes.push(Scope {
                    header: Statement::from_tokens(std::mem::take(&mut pending)),
                    parent: Some(cursor),
                    ..Scope::default()
                });
                scopes[cursor].children.push(index);
                cursor = index;
            }
            Token::Symbol('}') => {
                let Some(parent) = scopes[cursor].parent else {
                    return Err(DhcpConfigError::CloseGlobal);
                };
                if !pending.is_empty() {
                    return Err(DhcpConfigError::Unterminated { tokens: pending });
                }
                cursor = parent;
            }
            Token::Symbol(';') => {
                // an empty statement carries nothing to interpret
                if !pending.is_empty() {
                    let statement = Statement::from_tokens(std::mem::take(&mut pending));
                    scopes[cursor].statements.push(statement);
                }
            }
            other => pending.push(other.into_text()),
        }
    }

    if !pending.is_empty() {
        return Err(DhcpConfigError::Unterminated { tokens: pending });
    }
    if cursor != ScopeTree::ROOT {
        return Err(DhcpConfigError::Unclosed {
            scope: scopes[cursor].header.to_string(),
        });
    }

    Ok(ScopeTree { scopes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{tokenize, DHCP_CONFIG};

    fn parse(input: &str) -> Result<ScopeTree, DhcpConfigError> {
        parse_scopes(tokenize(input.bytes(), &DHCP_CONFIG))
    }

    #[test]
    fn nests_scopes_under_cursor() {
        let tree = parse("a 1; subnet x { b; host h { c 2; } } d;").expect("parse");
        assert_eq!(tree.scopes.len(), 3);
        let root = &tree.scopes[ScopeTree::ROOT];
        assert_eq!(root.statements.len(), 2);
        assert_eq!(root.children, vec![1]);
        assert_eq!(tree.scopes[1].header.name, "subnet");
        assert_eq!(tree.scopes[2].parent, Some(1));
        assert_eq!(tree.scopes[2].statements[0].operands, vec!["2"]);
    }

    #[test]
    fn refuses_to_close_global() {
        let err = parse("a; }").expect_err("stray brace");
        assert!(matches!(err, DhcpConfigError::CloseGlobal));
        assert!(err.to_string().contains("cannot close global"));
    }

    #[test]
    fn rejects_tokens_pending_at_close() {
        let err = parse("group { a b }").expect_err("unterminated");
        assert!(matches!(err, DhcpConfigError::Unterminated { .. }));
    }

    #[test]
    fn rejects_unclosed_scope() {
        let err = parse("group { a;").expect_err("unclosed");
        assert!(matches!(err, DhcpConfigError::Unclosed { .. }));
    }
}
