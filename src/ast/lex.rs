//! Source lexer.

use logos::{self, Logos};

/// One lexical token. Keywords lex as [Token::Ident]; the parser interprets
/// them by text, so contextual words (`from`, `as`, `static`) need no
/// special cases here.
#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Token {
    // Brackets
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Separators
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("=>")]
    Arrow,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,

    // Operators
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNotEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("=")]
    Eq,
    #[token("!")]
    Bang,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    Nullish,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Literals
    #[regex(r"0[xX][0-9a-fA-F]+|[0-9][0-9_]*(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Num,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Str,
    /// A whole template literal, backticks included. The callback consumes
    /// through the matching closing backtick, tracking `${}` nesting.
    #[token("`", template)]
    Template,

    // Names
    #[regex(r"[\p{XID_Start}$_][\p{XID_Continue}$]*")]
    Ident,
    #[regex(r"#[\p{XID_Start}$_][\p{XID_Continue}$]*")]
    PrivateIdent,

    // Comments are tokens: the parser collects them for the printer.
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
    BlockComment,

    #[error]
    #[regex(r"[ \t\r\n\u{feff}]+", logos::skip)]
    Error,
}

/// Consume a template literal body (the opening backtick is already
/// matched). Returns false on an unterminated template.
fn template(lex: &mut logos::Lexer<Token>) -> bool {
    enum Mode {
        // Template text; pops on an unescaped backtick.
        Text,
        // Inside `${ ... }`; tracks unmatched `{`.
        Expr(u32),
    }
    let bytes = lex.remainder().as_bytes();
    let mut stack = vec![Mode::Text];
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match stack.last_mut() {
            Some(Mode::Text) => match b {
                b'\\' => i += 1,
                b'`' => {
                    stack.pop();
                    if stack.is_empty() {
                        lex.bump(i + 1);
                        return true;
                    }
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    stack.push(Mode::Expr(0));
                    i += 1;
                }
                _ => {}
            },
            Some(Mode::Expr(depth)) => match b {
                b'{' => *depth += 1,
                b'}' => {
                    if *depth == 0 {
                        stack.pop();
                    } else {
                        *depth -= 1;
                    }
                }
                b'`' => stack.push(Mode::Text),
                b'\'' | b'"' => {
                    // Skip a string literal so its braces don't count.
                    i += 1;
                    while i < bytes.len() && bytes[i] != b {
                        if bytes[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                _ => {}
            },
            None => unreachable!(),
        }
        i += 1;
    }
    // Unterminated: consume the rest so the error token covers it.
    lex.bump(bytes.len());
    false
}

#[cfg(test)]
mod test {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        Token::lexer(src).collect()
    }

    #[test]
    fn all_tokens() {
        assert_eq!(
            toks("var a = b.c['d'] + 1;"),
            vec![
                Token::Ident,
                Token::Ident,
                Token::Eq,
                Token::Ident,
                Token::Dot,
                Token::Ident,
                Token::LBracket,
                Token::Str,
                Token::RBracket,
                Token::Plus,
                Token::Num,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn template_is_one_token() {
        assert_eq!(toks("`a${x + `${y}`}b`"), vec![Token::Template]);
        let mut lex = Token::lexer("`a${b}c` + 1");
        assert_eq!(lex.next(), Some(Token::Template));
        assert_eq!(lex.slice(), "`a${b}c`");
    }

    #[test]
    fn unterminated_template_is_error() {
        assert_eq!(toks("`abc"), vec![Token::Error]);
    }

    #[test]
    fn template_with_braced_string() {
        let mut lex = Token::lexer("`${f('}')}`;");
        assert_eq!(lex.next(), Some(Token::Template));
        assert_eq!(lex.slice(), "`${f('}')}`");
    }

    #[test]
    fn comments_and_private_names() {
        assert_eq!(
            toks("// line\na.#b /* block */ ;"),
            vec![
                Token::LineComment,
                Token::Ident,
                Token::Dot,
                Token::PrivateIdent,
                Token::BlockComment,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn block_comment_shapes() {
        for src in ["/**/", "/* a */", "/* *a* */", "/***/", "/* a\nb */"] {
            assert_eq!(toks(src), vec![Token::BlockComment], "{src}");
        }
        assert_eq!(
            toks("a /* x */ b"),
            vec![Token::Ident, Token::BlockComment, Token::Ident]
        );
    }

    #[test]
    fn unicode_idents() {
        assert_eq!(toks("日本語 = $_1;"), vec![Token::Ident, Token::Eq, Token::Ident, Token::Semi]);
    }
}
