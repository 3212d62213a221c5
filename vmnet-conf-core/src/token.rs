//! Lexical tokens and the rule-driven tokenizer behind every grammar.

use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

/// One unit of lexical meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare word.
    Word(String),
    /// A double-quoted string; the quotes are retained.
    Quoted(String),
    /// A single-character structural symbol such as `{` or `=`.
    Symbol(char),
    /// A line boundary. Runs of line breaks collapse into one.
    Newline,
}

impl Token {
    /// Text form of the token, quotes included.
    pub fn into_text(self) -> String {
        match self {
            Token::Word(text) | Token::Quoted(text) => text,
            Token::Symbol(symbol) => symbol.to_string(),
            Token::Newline => "\n".to_string(),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(text) | Token::Quoted(text) => f.write_str(text),
            Token::Symbol(symbol) => write!(f, "{symbol}"),
            Token::Newline => f.write_str("\\n"),
        }
    }
}

/// Separator rules for one grammar.
#[derive(Debug)]
pub struct Rules {
    /// Bytes emitted as their own [`Token::Symbol`], flushing any pending word.
    pub symbols: &'static [u8],
    /// Bytes that mark a line boundary and become [`Token::Newline`].
    pub line_breaks: &'static [u8],
    /// Whether `"` starts a span that is opaque to separators.
    pub quotes: bool,
}

/// `dhcpd.conf`: braces and semicolons are structural, newlines are whitespace.
pub const DHCP_CONFIG: Rules = Rules {
    symbols: b"{};",
    line_breaks: b"",
    quotes: true,
};

/// `netmap.conf`: `network.attribute = "value"` one per line.
pub const NETWORK_MAP: Rules = Rules {
    symbols: b".=",
    line_breaks: b"\n",
    quotes: true,
};

/// `networking`: whitespace separated words, one command per line.
pub const NETWORKING: Rules = Rules {
    symbols: b"",
    line_breaks: b"\r\n",
    quotes: false,
};

/// Build a tokenizer over a filtered byte stream.
pub fn tokenize<I>(bytes: I, rules: &'static Rules) -> Tokenizer<I>
where
    I: Iterator<Item = u8>,
{
    Tokenizer {
        bytes,
        rules,
        word: Vec::new(),
        quoted: false,
        after_break: false,
        queue: VecDeque::new(),
    }
}

/// Iterator returned by [`tokenize`].
#[derive(Debug)]
pub struct Tokenizer<I> {
    bytes: I,
    rules: &'static Rules,
    word: Vec<u8>,
    quoted: bool,
    after_break: bool,
    queue: VecDeque<Token>,
}

impl<I> Tokenizer<I>
where
    I: Iterator<Item = u8>,
{
    fn flush(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.word).into_owned();
        self.word.clear();
        if text.starts_with('"') {
            self.queue.push_back(Token::Quoted(text));
        } else {
            self.queue.push_back(Token::Word(text));
        }
    }

    fn feed(&mut self, byte: u8) {
        if self.quoted {
            self.word.push(byte);
            if byte == b'"' {
                self.quoted = false;
                self.flush();
            }
            return;
        }

        if self.rules.line_breaks.contains(&byte) {
            if !self.after_break {
                self.flush();
                self.queue.push_back(Token::Newline);
                self.after_break = true;
            }
            return;
        }

        match byte {
            b' ' | b'\t' | b'\r' | b'\n' => {
                self.flush();
                // whitespace does not end a run of line breaks
                return;
            }
            b'"' if self.rules.quotes => {
                self.quoted = true;
                self.word.push(byte);
            }
            _ if self.rules.symbols.contains(&byte) => {
                self.flush();
                self.queue.push_back(Token::Symbol(char::from(byte)));
            }
            _ => self.word.push(byte),
        }
        self.after_break = false;
    }
}

impl<I> Iterator for Tokenizer<I>
where
    I: Iterator<Item = u8>,
{
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }
            match self.bytes.next() {
                Some(byte) => self.feed(byte),
                None => {
                    self.flush();
                    return self.queue.pop_front();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str, rules: &'static Rules) -> Vec<String> {
        tokenize(input.bytes(), rules)
            .map(Token::into_text)
            .collect()
    }

    #[test]
    fn dhcp_config_emits_structural_symbols() {
        assert_eq!(
            words("host vm1{hardware ethernet 00:0c:29:aa:bb:cc;}", &DHCP_CONFIG),
            vec!["host", "vm1", "{", "hardware", "ethernet", "00:0c:29:aa:bb:cc", ";", "}"]
        );
    }

    #[test]
    fn quoted_spans_are_opaque() {
        let tokens: Vec<Token> =
            tokenize("option domain-name \"a b; {c}\";".bytes(), &DHCP_CONFIG).collect();
        assert_eq!(tokens[2], Token::Quoted("\"a b; {c}\"".to_string()));
        assert_eq!(tokens[3], Token::Symbol(';'));
    }

    #[test]
    fn network_map_collapses_line_breaks() {
        assert_eq!(
            words("\n\nnetwork0.name = \"x\"\n \n\nnetwork0.device = \"vmnet0\"", &NETWORK_MAP),
            vec![
                "\n", "network0", ".", "name", "=", "\"x\"", "\n", "network0", ".", "device",
                "=", "\"vmnet0\""
            ]
        );
    }

    #[test]
    fn networking_treats_carriage_return_as_line_break() {
        assert_eq!(
            words("VERSION=1,0\r\nanswer VNET_1_DHCP yes\n", &NETWORKING),
            vec!["VERSION=1,0", "\n", "answer", "VNET_1_DHCP", "yes", "\n"]
        );
    }

    #[test]
    fn unterminated_quote_is_flushed_at_end() {
        assert_eq!(words("name \"open", &DHCP_CONFIG), vec!["name", "\"open"]);
    }
}
