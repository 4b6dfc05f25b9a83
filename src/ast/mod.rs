//! The host syntax tree: a compact ECMAScript subset.
//!
//! The engine only ever classifies and rewrites nodes; it never needs the
//! full language. The subset here covers every position the syntax gate
//! distinguishes: declarations, patterns, import/export specifiers,
//! property keys, member chains, and ordinary expression reads.
//!
//! Every node carries a [Span]. Spans tag their origin ([SpanSrc]): either
//! the file being transformed, or the value text of a configuration entry.
//! The printer uses that tag to emit synthetic source-map locations for
//! inserted replacement expressions.

pub(crate) mod lex;
pub mod parse;
pub mod print;
pub mod scope;

/// Which text a span's offsets point into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanSrc {
    /// The source file currently being transformed.
    File,
    /// The value text of configuration entry `i`.
    Config(u32),
}

/// A byte range in some source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    /// Start byte offset.
    pub lo: u32,
    /// End byte offset (exclusive).
    pub hi: u32,
    /// Which text the offsets point into.
    pub src: SpanSrc,
}

impl Span {
    /// A span over `lo..hi` in `src`.
    pub fn new(lo: u32, hi: u32, src: SpanSrc) -> Self {
        Span { lo, hi, src }
    }
}

/// Byte offsets of line starts; converts offsets to (line, column).
#[derive(Clone, Debug)]
pub struct LineIndex {
    starts: Vec<u32>,
}

impl LineIndex {
    /// Index `text`.
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i as u32 + 1);
            }
        }
        LineIndex { starts }
    }

    /// (1-based line, 0-based byte column) of `offset`.
    pub fn loc(&self, offset: u32) -> (u32, u32) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line as u32 + 1, offset - self.starts[line])
    }
}

/// A comment, as lexed. `text` includes the `//` or `/* */` delimiters.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    /// Raw comment text, delimiters included.
    pub text: String,
    /// Location in the file.
    pub span: Span,
}

/// A parsed file.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    /// Top-level statements.
    pub body: Vec<Stmt>,
    /// All comments, in source order.
    pub comments: Vec<Comment>,
}

/// An identifier occurrence (any position; the parent decides its role).
#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    /// The name, as written.
    pub name: String,
    /// Location.
    pub span: Span,
}

/// A string literal. `raw` keeps the original quoting for printing.
#[derive(Clone, Debug, PartialEq)]
pub struct StrLit {
    /// Cooked (unescaped) value.
    pub value: String,
    /// Literal text, quotes included.
    pub raw: String,
    /// Location.
    pub span: Span,
}

/// A numeric literal, kept as written.
#[derive(Clone, Debug, PartialEq)]
pub struct NumLit {
    /// Literal text.
    pub raw: String,
    /// Location.
    pub span: Span,
}

/// One static chunk of a template literal.
#[derive(Clone, Debug, PartialEq)]
pub struct TplChunk {
    /// Cooked (unescaped) text.
    pub cooked: String,
    /// Raw text, as written between delimiters.
    pub raw: String,
    /// Location.
    pub span: Span,
}

/// A template literal: `quasis.len() == exprs.len() + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tpl {
    /// Static chunks.
    pub quasis: Vec<TplChunk>,
    /// Interpolated expressions, between consecutive chunks.
    pub exprs: Vec<Expr>,
    /// Location of the whole literal.
    pub span: Span,
}

/// The property part of a member access.
#[derive(Clone, Debug, PartialEq)]
pub enum MemberProp {
    /// `obj.name`
    Ident(Ident),
    /// `obj.#name`
    Private(Ident),
    /// `obj[expr]`
    Computed(Box<Expr>),
}

/// A member access.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    /// The object being accessed.
    pub obj: Box<Expr>,
    /// The property.
    pub prop: MemberProp,
    /// Location.
    pub span: Span,
}

/// Unary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Plus,
    /// `typeof`
    Typeof,
    /// `void`
    Void,
}

impl UnaryOp {
    /// Operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
        }
    }
}

/// Binary (non-logical) operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl BinaryOp {
    /// Operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::EqEq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

/// Logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `??`
    Nullish,
}

impl LogicalOp {
    /// Operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
            LogicalOp::Nullish => "??",
        }
    }
}

/// Assignment operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
}

impl AssignOp {
    /// Operator text.
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        }
    }
}

/// A call or array argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A plain expression argument.
    Expr(Expr),
    /// `...expr`
    Spread(Expr, Span),
}

/// A property key (object literal, object pattern, or class member).
#[derive(Clone, Debug, PartialEq)]
pub enum PropKey {
    /// `{ name: _ }`
    Ident(Ident),
    /// `{ "name": _ }`
    Str(StrLit),
    /// `{ 0: _ }`
    Num(NumLit),
    /// `{ [expr]: _ }`
    Computed(Box<Expr>),
    /// `class { #name }`
    Private(Ident),
}

/// An object-literal property.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjProp {
    /// `key: value`
    KeyValue {
        /// The key.
        key: PropKey,
        /// The value expression.
        value: Expr,
        /// Location.
        span: Span,
    },
    /// `{ name }`
    Shorthand {
        /// The shared key/value identifier.
        id: Ident,
        /// Location.
        span: Span,
    },
    /// `key() { ... }`
    Method {
        /// The method name.
        key: PropKey,
        /// Parameters and body.
        func: Func,
        /// Location.
        span: Span,
    },
    /// `...expr`
    Spread {
        /// The spread argument.
        expr: Expr,
        /// Location.
        span: Span,
    },
}

/// A binding pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum Pat {
    /// A plain name.
    Ident(Ident),
    /// `inner = default`
    Default {
        /// The pattern being defaulted.
        inner: Box<Pat>,
        /// The default value, evaluated when the bound value is undefined.
        default: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `...inner`
    Rest {
        /// The pattern receiving the rest.
        inner: Box<Pat>,
        /// Location.
        span: Span,
    },
    /// `[a, , b]` (holes allowed)
    Array {
        /// Elements; `None` is a hole.
        elems: Vec<Option<Pat>>,
        /// Location.
        span: Span,
    },
    /// `{ a, b: c, ...rest }`
    Object {
        /// Properties.
        props: Vec<ObjPatProp>,
        /// Location.
        span: Span,
    },
}

/// One property of an object pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjPatProp {
    /// `key: value` (or shorthand, where `value` is the key identifier).
    KeyValue {
        /// The source property key.
        key: PropKey,
        /// The binding target.
        value: Pat,
        /// Shorthand form `{ a }` / `{ a = 1 }`.
        shorthand: bool,
        /// Location.
        span: Span,
    },
    /// `...rest`
    Rest {
        /// The pattern receiving the rest.
        pat: Pat,
        /// Location.
        span: Span,
    },
}

/// A function: declaration, expression, or method body.
#[derive(Clone, Debug, PartialEq)]
pub struct Func {
    /// Name, if any. Binds inside the function for function expressions.
    pub id: Option<Ident>,
    /// Parameter patterns.
    pub params: Vec<Pat>,
    /// Body statements.
    pub body: Vec<Stmt>,
    /// Location.
    pub span: Span,
}

/// An arrow function body.
#[derive(Clone, Debug, PartialEq)]
pub enum ArrowBody {
    /// `=> expr`
    Expr(Box<Expr>),
    /// `=> { ... }`
    Block(Vec<Stmt>),
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A name read (or write target; the parent decides).
    Ident(Ident),
    /// A string literal.
    Str(StrLit),
    /// A numeric literal.
    Num(NumLit),
    /// `true` / `false`
    Bool(bool, Span),
    /// `null`
    Null(Span),
    /// `this`
    This(Span),
    /// A template literal.
    Tpl(Tpl),
    /// A member access.
    Member(Member),
    /// A call.
    Call {
        /// The callee.
        callee: Box<Expr>,
        /// The arguments.
        args: Vec<Arg>,
        /// Location.
        span: Span,
    },
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        arg: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// A binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// A short-circuiting operation.
    Logical {
        /// The operator.
        op: LogicalOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `test ? cons : alt`
    Cond {
        /// Condition.
        test: Box<Expr>,
        /// Then-value.
        cons: Box<Expr>,
        /// Else-value.
        alt: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// An assignment. `target` is an identifier or member chain.
    Assign {
        /// The operator.
        op: AssignOp,
        /// The write target.
        target: Box<Expr>,
        /// The assigned value.
        value: Box<Expr>,
        /// Location.
        span: Span,
    },
    /// `a, b, c`
    Seq {
        /// The expressions, in evaluation order.
        exprs: Vec<Expr>,
        /// Location.
        span: Span,
    },
    /// An array literal.
    Array {
        /// Elements; `None` is a hole.
        elems: Vec<Option<Arg>>,
        /// Location.
        span: Span,
    },
    /// An object literal.
    Object {
        /// Properties.
        props: Vec<ObjProp>,
        /// Location.
        span: Span,
    },
    /// A function expression.
    Fn(Box<Func>),
    /// An arrow function.
    Arrow {
        /// Parameter patterns.
        params: Vec<Pat>,
        /// The body.
        body: ArrowBody,
        /// Location.
        span: Span,
    },
}

impl Expr {
    /// This expression's span.
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(i) => i.span,
            Expr::Str(s) => s.span,
            Expr::Num(n) => n.span,
            Expr::Bool(_, s) | Expr::Null(s) | Expr::This(s) => *s,
            Expr::Tpl(t) => t.span,
            Expr::Member(m) => m.span,
            Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Cond { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Seq { span, .. }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Arrow { span, .. } => *span,
            Expr::Fn(f) => f.span,
        }
    }
}

/// `var` / `let` / `const`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclKind {
    /// Function-scoped.
    Var,
    /// Block-scoped.
    Let,
    /// Block-scoped, immutable.
    Const,
}

impl DeclKind {
    /// Keyword text.
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

/// One declarator in a variable declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct Declarator {
    /// The binding target.
    pub id: Pat,
    /// The initializer, if any.
    pub init: Option<Expr>,
    /// Location.
    pub span: Span,
}

/// A class member.
#[derive(Clone, Debug, PartialEq)]
pub enum ClassMember {
    /// A method.
    Method {
        /// The method name.
        key: PropKey,
        /// Parameters and body.
        func: Func,
        /// `static` member.
        is_static: bool,
        /// Location.
        span: Span,
    },
    /// A field, with optional initializer.
    Field {
        /// The field name.
        key: PropKey,
        /// The initializer.
        value: Option<Expr>,
        /// `static` member.
        is_static: bool,
        /// Location.
        span: Span,
    },
}

/// A class declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    /// The class name.
    pub id: Ident,
    /// `extends` clause.
    pub superclass: Option<Expr>,
    /// Members.
    pub members: Vec<ClassMember>,
    /// Location.
    pub span: Span,
}

/// The imported/exported name side of a specifier (`a` or `"a-b"`).
#[derive(Clone, Debug, PartialEq)]
pub enum ModuleName {
    /// A plain identifier.
    Ident(Ident),
    /// A string module export name.
    Str(StrLit),
}

/// One import specifier.
#[derive(Clone, Debug, PartialEq)]
pub enum ImportSpec {
    /// `import x from ...`
    Default(Ident),
    /// `import * as x from ...`
    Namespace(Ident),
    /// `import { a } from ...` / `import { a as b } from ...`
    Named {
        /// The exported name in the source module.
        imported: ModuleName,
        /// The local binding.
        local: Ident,
    },
}

/// An import declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportDecl {
    /// Specifiers; empty for a bare `import 'm'`.
    pub specs: Vec<ImportSpec>,
    /// The module source.
    pub source: StrLit,
    /// Location.
    pub span: Span,
}

/// One specifier of a named export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSpec {
    /// The local name being exported.
    pub local: Ident,
    /// `as` name, if renamed.
    pub exported: Option<ModuleName>,
}

/// A statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// An expression statement.
    Expr {
        /// The expression.
        expr: Expr,
        /// Location.
        span: Span,
    },
    /// A variable declaration.
    VarDecl {
        /// `var` / `let` / `const`.
        kind: DeclKind,
        /// The declarators.
        decls: Vec<Declarator>,
        /// Location.
        span: Span,
    },
    /// A function declaration. `func.id` is always `Some`.
    Func(Func),
    /// A class declaration.
    Class(ClassDecl),
    /// `return expr?;`
    Return {
        /// The returned value, if any.
        arg: Option<Expr>,
        /// Location.
        span: Span,
    },
    /// `if (test) cons else alt?`
    If {
        /// Condition.
        test: Expr,
        /// Then-branch.
        cons: Box<Stmt>,
        /// Else-branch.
        alt: Option<Box<Stmt>>,
        /// Location.
        span: Span,
    },
    /// `while (test) body`
    While {
        /// Condition.
        test: Expr,
        /// Loop body.
        body: Box<Stmt>,
        /// Location.
        span: Span,
    },
    /// `{ ... }`
    Block {
        /// Statements.
        body: Vec<Stmt>,
        /// Location.
        span: Span,
    },
    /// An import declaration.
    Import(ImportDecl),
    /// `export { a, b as c };`
    ExportNamed {
        /// Specifiers.
        specs: Vec<ExportSpec>,
        /// Location.
        span: Span,
    },
    /// `export default expr;`
    ExportDefault {
        /// The exported value.
        expr: Expr,
        /// Location.
        span: Span,
    },
    /// `export <decl>`
    ExportDecl {
        /// The exported declaration.
        decl: Box<Stmt>,
        /// Location.
        span: Span,
    },
    /// `;`
    Empty(Span),
}

impl Stmt {
    /// This statement's span.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr { span, .. }
            | Stmt::VarDecl { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Block { span, .. }
            | Stmt::ExportNamed { span, .. }
            | Stmt::ExportDefault { span, .. }
            | Stmt::ExportDecl { span, .. } => *span,
            Stmt::Func(f) => f.span,
            Stmt::Class(c) => c.span,
            Stmt::Import(i) => i.span,
            Stmt::Empty(s) => *s,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn line_index_locs() {
        let idx = LineIndex::new("ab\ncd\n\nx");
        assert_eq!(idx.loc(0), (1, 0));
        assert_eq!(idx.loc(1), (1, 1));
        assert_eq!(idx.loc(3), (2, 0));
        assert_eq!(idx.loc(4), (2, 1));
        assert_eq!(idx.loc(6), (3, 0));
        assert_eq!(idx.loc(7), (4, 0));
    }
}
