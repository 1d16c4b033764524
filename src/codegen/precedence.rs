//! Binding strengths of Lua expressions.
//!
//! Every generated expression carries a [`Strength`]; every place an
//! expression is spliced into carries a [`Slot`]. The child is wrapped in
//! parentheses iff its strength is weaker than what the slot requires, so
//! a new block kind only declares the strength of what it emits.

/// How tightly an expression binds, from loosest to tightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strength {
    None = 0,
    Or = 1,
    And = 2,
    Relational = 3,
    Concat = 4,
    Additive = 5,
    Multiplicative = 6,
    Unary = 7,
    Power = 8,
    Call = 9,
    Atomic = 10,
}

impl Strength {
    /// The next tighter strength. `Atomic` is its own successor.
    pub fn tighter(self) -> Strength {
        match self {
            Strength::None => Strength::Or,
            Strength::Or => Strength::And,
            Strength::And => Strength::Relational,
            Strength::Relational => Strength::Concat,
            Strength::Concat => Strength::Additive,
            Strength::Additive => Strength::Multiplicative,
            Strength::Multiplicative => Strength::Unary,
            Strength::Unary => Strength::Power,
            Strength::Power => Strength::Call,
            Strength::Call | Strength::Atomic => Strength::Atomic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// The Lua operators the block library emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Not,
    Neg,
    Len,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Or => "or",
            Operator::And => "and",
            Operator::Eq => "==",
            Operator::Ne => "~=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Concat => "..",
            Operator::Add => "+",
            Operator::Sub | Operator::Neg => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Pow => "^",
            Operator::Not => "not ",
            Operator::Len => "#",
        }
    }

    pub fn strength(self) -> Strength {
        match self {
            Operator::Or => Strength::Or,
            Operator::And => Strength::And,
            Operator::Eq
            | Operator::Ne
            | Operator::Lt
            | Operator::Le
            | Operator::Gt
            | Operator::Ge => Strength::Relational,
            Operator::Concat => Strength::Concat,
            Operator::Add | Operator::Sub => Strength::Additive,
            Operator::Mul | Operator::Div | Operator::Mod => Strength::Multiplicative,
            Operator::Not | Operator::Neg | Operator::Len => Strength::Unary,
            Operator::Pow => Strength::Power,
        }
    }

    pub fn assoc(self) -> Assoc {
        match self {
            Operator::Concat | Operator::Pow => Assoc::Right,
            _ => Assoc::Left,
        }
    }
}

/// The position an expression is spliced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A function argument, table field, condition or statement position.
    Free,
    Left(Operator),
    Right(Operator),
    /// The operand of a unary operator.
    Operand(Operator),
    /// The callee or indexed value of a call (`(x):f()`, `(x)[i]`).
    Callee,
}

impl Slot {
    /// The weakest strength a child may have without being parenthesized.
    pub fn required(self) -> Strength {
        match self {
            Slot::Free => Strength::None,
            Slot::Left(op) => match op.assoc() {
                Assoc::Left => op.strength(),
                Assoc::Right => op.strength().tighter(),
            },
            Slot::Right(op) => match op.assoc() {
                Assoc::Left => op.strength().tighter(),
                Assoc::Right => op.strength(),
            },
            // `-x^2` is `-(x^2)` in Lua, so a power operand needs no grouping.
            Slot::Operand(op) => op.strength(),
            Slot::Callee => Strength::Call,
        }
    }

    pub fn needs_parens(self, child: Strength) -> bool {
        child < self.required()
    }
}

