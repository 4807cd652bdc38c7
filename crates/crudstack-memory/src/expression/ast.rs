//! Syntax tree for parsed expressions.
//!
//! Placeholders keep their marker: a name reference is stored as `#pk` and a
//! value reference as `:pk`, exactly the keys of the request's
//! attribute-name and attribute-value maps.

use std::fmt;

/// A condition, filter or key-condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `left op right`
    Compare {
        /// Left operand.
        left: Operand,
        /// Comparator.
        op: CompareOp,
        /// Right operand.
        right: Operand,
    },
    /// `value BETWEEN low AND high`, inclusive on both ends.
    Between {
        /// Tested operand.
        value: Operand,
        /// Lower bound.
        low: Operand,
        /// Upper bound.
        high: Operand,
    },
    /// `value IN (a, b, ...)`
    In {
        /// Tested operand.
        value: Operand,
        /// Candidates.
        list: Vec<Operand>,
    },
    /// `left AND right`
    And(Box<Expr>, Box<Expr>),
    /// `left OR right`
    Or(Box<Expr>, Box<Expr>),
    /// `NOT inner`
    Not(Box<Expr>),
    /// A boolean function call.
    Function {
        /// Which function.
        name: FunctionName,
        /// Arguments in call order.
        args: Vec<Operand>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// The operator with its operands swapped: `a < b` is `b > a`.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            other => other,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Boolean functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionName {
    /// `attribute_exists(path)`
    AttributeExists,
    /// `attribute_not_exists(path)`
    AttributeNotExists,
    /// `attribute_type(path, :type)`
    AttributeType,
    /// `begins_with(path, :prefix)`
    BeginsWith,
    /// `contains(path, :operand)`
    Contains,
}

impl FunctionName {
    /// Number of arguments the function takes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::AttributeExists | Self::AttributeNotExists => 1,
            Self::AttributeType | Self::BeginsWith | Self::Contains => 2,
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AttributeExists => "attribute_exists",
            Self::AttributeNotExists => "attribute_not_exists",
            Self::AttributeType => "attribute_type",
            Self::BeginsWith => "begins_with",
            Self::Contains => "contains",
        })
    }
}

/// Something that evaluates to an attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A document path into the item.
    Path(AttributePath),
    /// A `:value` placeholder.
    Value(String),
    /// `size(path)`
    Size(AttributePath),
}

/// A document path such as `#info.rating` or `tags[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    /// Path elements, outermost first.
    pub elements: Vec<PathElement>,
}

impl AttributePath {
    /// A one-element path.
    #[must_use]
    pub fn top(name: impl Into<String>) -> Self {
        Self {
            elements: vec![PathElement::Attribute(name.into())],
        }
    }

    /// The first element, if it names an attribute.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self.elements.first() {
            Some(PathElement::Attribute(name)) => Some(name),
            _ => None,
        }
    }

    /// Whether the path names a top-level attribute only.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.elements.len() == 1
    }
}

/// One step of a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// A map key: a plain name or a `#name` placeholder.
    Attribute(String),
    /// A list index.
    Index(usize),
}

/// A parsed update expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpr {
    /// `SET path = value` actions.
    pub set: Vec<SetAction>,
    /// `REMOVE path` actions.
    pub remove: Vec<AttributePath>,
    /// `ADD path value` actions.
    pub add: Vec<PathValue>,
    /// `DELETE path value` actions.
    pub delete: Vec<PathValue>,
}

impl UpdateExpr {
    /// Whether the expression has no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty() && self.add.is_empty() && self.delete.is_empty()
    }

    /// Every path the expression writes or removes.
    pub fn targets(&self) -> impl Iterator<Item = &AttributePath> {
        self.set
            .iter()
            .map(|a| &a.path)
            .chain(self.remove.iter())
            .chain(self.add.iter().map(|a| &a.path))
            .chain(self.delete.iter().map(|a| &a.path))
    }
}

/// `SET path = value`
#[derive(Debug, Clone, PartialEq)]
pub struct SetAction {
    /// Target path.
    pub path: AttributePath,
    /// New value.
    pub value: SetValue,
}

/// Right-hand side of a SET action.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    /// A plain operand.
    Operand(Operand),
    /// `a + b`
    Plus(Operand, Operand),
    /// `a - b`
    Minus(Operand, Operand),
    /// `if_not_exists(path, default)`
    IfNotExists(AttributePath, Operand),
    /// `list_append(a, b)`
    ListAppend(Operand, Operand),
}

/// A path paired with a value, as used by ADD and DELETE.
#[derive(Debug, Clone, PartialEq)]
pub struct PathValue {
    /// Target path.
    pub path: AttributePath,
    /// Value operand.
    pub value: Operand,
}
