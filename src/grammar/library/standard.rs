use crate::codegen::{Emitted, Emitter, Generatable, Operator, Slot, Strength, lua};
use crate::error::GrammarError;
use crate::grammar::{BlockType, Category, FieldKind, Registry, Socket, TypeTag};
use crate::graph::Block;
use serde_json::Value;

pub fn register(registry: &mut Registry) {
    registry.register(if_block(false));

    registry.register(
        BlockType::value("logic_compare", TypeTag::Boolean, logic_compare)
            .field(
                "OP",
                FieldKind::dropdown([
                    ("=", "EQ"),
                    ("\u{2260}", "NEQ"),
                    ("<", "LT"),
                    ("\u{2264}", "LTE"),
                    (">", "GT"),
                    ("\u{2265}", "GTE"),
                ]),
            )
            .input_or("A", TypeTag::Any, "0")
            .input_or("B", TypeTag::Any, "0")
            .category(Category::Logic),
    );
    registry.register(
        BlockType::value("logic_operation", TypeTag::Boolean, logic_operation)
            .field("OP", FieldKind::dropdown([("and", "AND"), ("or", "OR")]))
            .input("A", TypeTag::Boolean)
            .input("B", TypeTag::Boolean)
            .category(Category::Logic),
    );
    registry.register(
        BlockType::value("logic_negate", TypeTag::Boolean, logic_negate)
            .input("BOOL", TypeTag::Boolean)
            .category(Category::Logic),
    );
    registry.register(
        BlockType::value("logic_boolean", TypeTag::Boolean, logic_boolean)
            .field("BOOL", FieldKind::dropdown([("true", "TRUE"), ("false", "FALSE")]))
            .category(Category::Logic),
    );

    registry.register(
        BlockType::statement("controls_repeat_ext", repeat)
            .input_or("TIMES", TypeTag::Number, "10")
            .statements("DO")
            .category(Category::Loops),
    );
    registry.register(
        BlockType::statement("controls_whileUntil", while_until)
            .field("MODE", FieldKind::dropdown([("while", "WHILE"), ("until", "UNTIL")]))
            .input_or("BOOL", TypeTag::Boolean, "false")
            .statements("DO")
            .category(Category::Loops),
    );
    registry.register(
        BlockType::statement("controls_for", count_loop)
            .field("VAR", FieldKind::Variable { default: "i".to_string() })
            .input_or("FROM", TypeTag::Number, "1")
            .input_or("TO", TypeTag::Number, "10")
            .input_or("BY", TypeTag::Number, "1")
            .statements("DO")
            .category(Category::Loops),
    );
    registry.register(
        BlockType::statement("controls_forEach", for_each)
            .field("VAR", FieldKind::Variable { default: "j".to_string() })
            .input_or("LIST", TypeTag::Any, "{}")
            .statements("DO")
            .category(Category::Loops),
    );

    registry.register(
        BlockType::value("math_number", TypeTag::Number, math_number)
            .field("NUM", FieldKind::number(0.0))
            .category(Category::Math),
    );
    registry.register(
        BlockType::value("math_arithmetic", TypeTag::Number, math_arithmetic)
            .field(
                "OP",
                FieldKind::dropdown([
                    ("+", "ADD"),
                    ("-", "MINUS"),
                    ("\u{d7}", "MULTIPLY"),
                    ("\u{f7}", "DIVIDE"),
                    ("^", "POWER"),
                ]),
            )
            .input("A", TypeTag::Number)
            .input("B", TypeTag::Number)
            .category(Category::Math),
    );
    registry.register(
        BlockType::value("math_modulo", TypeTag::Number, math_modulo)
            .input("DIVIDEND", TypeTag::Number)
            .input_or("DIVISOR", TypeTag::Number, "1")
            .category(Category::Math),
    );
    registry.register(
        BlockType::value("math_constrain", TypeTag::Number, math_constrain)
            .input("VALUE", TypeTag::Number)
            .input("LOW", TypeTag::Number)
            .input_or("HIGH", TypeTag::Number, "math.huge")
            .category(Category::Math),
    );
    registry.register(
        BlockType::value("math_random_int", TypeTag::Number, math_random_int)
            .input("FROM", TypeTag::Number)
            .input("TO", TypeTag::Number)
            .category(Category::Math),
    );

    registry.register(
        BlockType::value("text", TypeTag::String, text)
            .field("TEXT", FieldKind::Text { default: String::new() })
            .category(Category::Text),
    );
    registry.register(
        BlockType::value("text_join", TypeTag::String, TextJoin).category(Category::Text),
    );
    registry.register(
        BlockType::value("text_length", TypeTag::Number, text_length)
            .input("VALUE", TypeTag::String)
            .category(Category::Text),
    );
    registry.register(
        BlockType::value("text_indexOf", TypeTag::Number, text_index_of)
            .field("END", FieldKind::dropdown([("first", "FIRST"), ("last", "LAST")]))
            .input("VALUE", TypeTag::String)
            .input("FIND", TypeTag::String)
            .category(Category::Text),
    );
    registry.register(
        BlockType::value("text_charAt", TypeTag::String, text_char_at)
            .field(
                "WHERE",
                FieldKind::dropdown([
                    ("letter #", "FROM_START"),
                    ("letter # from end", "FROM_END"),
                    ("first letter", "FIRST"),
                    ("last letter", "LAST"),
                ]),
            )
            .input("VALUE", TypeTag::String)
            .input_or("AT", TypeTag::Number, "1")
            .category(Category::Text),
    );

    registry.register(
        BlockType::value("variables_get", TypeTag::Any, variables_get)
            .field("VAR", FieldKind::Variable { default: "item".to_string() })
            .category(Category::Variables),
    );
    registry.register(
        BlockType::statement("variables_set", variables_set)
            .field("VAR", FieldKind::Variable { default: "item".to_string() })
            .input("VALUE", TypeTag::Any)
            .category(Category::Variables),
    );
}

/// The `controls_if` rule. With `else_by_default`, a block without extra
/// state gets an `ELSE` branch.
pub fn if_block(else_by_default: bool) -> BlockType {
    BlockType::statement("controls_if", ControlsIf { else_by_default })
        .input("IF0", TypeTag::Boolean)
        .statements("DO0")
        .category(Category::Logic)
}

/// `if` / `elseif` / `else` chain shaped by `{"elseIfCount": n, "hasElse": bool}`.
#[derive(Debug, Clone, Copy)]
pub struct ControlsIf {
    pub else_by_default: bool,
}

/// Upper bound on the `elseIfCount` and `itemCount` a stored block may declare.
pub const MAX_REPEATED_INPUTS: u64 = 100;

/// Reads a repeat count from extra state. Counts above the bound are clamped
/// here and refused by `check_count` when a block is validated.
fn count(state: Option<&Value>, key: &str, default: u64) -> usize {
    let n = state
        .and_then(|s| s.get(key))
        .and_then(Value::as_u64)
        .unwrap_or(default);
    n.min(MAX_REPEATED_INPUTS) as usize
}

fn check_count(state: Option<&Value>, key: &str) -> Result<(), String> {
    match state.and_then(|s| s.get(key)).and_then(Value::as_u64) {
        Some(n) if n > MAX_REPEATED_INPUTS => Err(format!(
            "{key} is {n}, at most {MAX_REPEATED_INPUTS} is supported"
        )),
        _ => Ok(()),
    }
}

impl ControlsIf {
    fn shape(&self, state: Option<&Value>) -> (usize, bool) {
        let else_ifs = count(state, "elseIfCount", 0);
        let has_else = state
            .and_then(|s| s.get("hasElse"))
            .and_then(Value::as_bool)
            .unwrap_or(self.else_by_default);
        (else_ifs, has_else)
    }
}

impl Generatable for ControlsIf {
    fn emit(&self, block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
        let (else_ifs, has_else) = self.shape(block.extra_state.as_ref());
        let mut code = String::new();
        for i in 0..=else_ifs {
            let condition = cx.value_or(block, &format!("IF{i}"), Slot::Free, "false")?;
            let body = cx.statements(block, &format!("DO{i}"))?;
            let keyword = if i == 0 { "if" } else { "elseif" };
            code.push_str(&format!("{keyword} {condition} then\n{body}"));
        }
        if has_else {
            code.push_str("else\n");
            code.push_str(&cx.statements(block, "ELSE")?);
        }
        code.push_str("end\n");
        Ok(Emitted::statement(code))
    }

    fn extra_sockets(&self, state: Option<&Value>) -> Vec<Socket> {
        let (else_ifs, has_else) = self.shape(state);
        let mut sockets = Vec::with_capacity(else_ifs * 2 + 1);
        for i in 1..=else_ifs {
            sockets.push(Socket::value(format!("IF{i}"), TypeTag::Boolean));
            sockets.push(Socket::statement(format!("DO{i}")));
        }
        if has_else {
            sockets.push(Socket::statement("ELSE"));
        }
        sockets
    }

    fn check_extra_state(&self, state: Option<&Value>) -> Result<(), String> {
        check_count(state, "elseIfCount")
    }
}

/// String concatenation of `{"itemCount": n}` inputs `ADD0..ADDn`.
#[derive(Debug, Clone, Copy)]
pub struct TextJoin;

impl TextJoin {
    fn items(state: Option<&Value>) -> usize {
        count(state, "itemCount", 2)
    }
}

impl Generatable for TextJoin {
    fn emit(&self, block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
        match Self::items(block.extra_state.as_ref()) {
            0 => Ok(Emitted::atom("\"\"")),
            1 => {
                let item = cx.value_or(block, "ADD0", Slot::Free, "\"\"")?;
                Ok(Emitted::atom(format!("tostring({item})")))
            }
            2 => {
                let left = cx.value_or(block, "ADD0", Slot::Left(Operator::Concat), "\"\"")?;
                let right = cx.value_or(block, "ADD1", Slot::Right(Operator::Concat), "\"\"")?;
                Ok(Emitted::expression(
                    format!("{left} .. {right}"),
                    Strength::Concat,
                ))
            }
            n => {
                let items = (0..n)
                    .map(|i| cx.value_or(block, &format!("ADD{i}"), Slot::Free, "\"\""))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Emitted::atom(format!("table.concat({{{}}})", items.join(", "))))
            }
        }
    }

    fn extra_sockets(&self, state: Option<&Value>) -> Vec<Socket> {
        (0..Self::items(state))
            .map(|i| Socket::value(format!("ADD{i}"), TypeTag::Any))
            .collect()
    }

    fn check_extra_state(&self, state: Option<&Value>) -> Result<(), String> {
        check_count(state, "itemCount")
    }
}

fn binary(
    block: &Block,
    cx: &mut Emitter<'_>,
    op: Operator,
    fallback: Option<&str>,
) -> Result<Emitted, GrammarError> {
    let (left, right) = match fallback {
        Some(literal) => (
            cx.value_or(block, "A", Slot::Left(op), literal)?,
            cx.value_or(block, "B", Slot::Right(op), literal)?,
        ),
        None => (
            cx.value(block, "A", Slot::Left(op))?,
            cx.value(block, "B", Slot::Right(op))?,
        ),
    };
    Ok(Emitted::expression(
        format!("{left} {} {right}", op.symbol()),
        op.strength(),
    ))
}

fn logic_compare(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let op = match cx.field(block, "OP").as_str() {
        "NEQ" => Operator::Ne,
        "LT" => Operator::Lt,
        "LTE" => Operator::Le,
        "GT" => Operator::Gt,
        "GTE" => Operator::Ge,
        _ => Operator::Eq,
    };
    binary(block, cx, op, None)
}

fn logic_operation(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    // An empty side must not change the result: `x and true`, `x or false`.
    match cx.field(block, "OP").as_str() {
        "OR" => binary(block, cx, Operator::Or, Some("false")),
        _ => binary(block, cx, Operator::And, Some("true")),
    }
}

fn logic_negate(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let operand = cx.value(block, "BOOL", Slot::Operand(Operator::Not))?;
    Ok(Emitted::expression(format!("not {operand}"), Strength::Unary))
}

fn logic_boolean(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let literal = if cx.field(block, "BOOL") == "FALSE" {
        "false"
    } else {
        "true"
    };
    Ok(Emitted::atom(literal))
}

fn repeat(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let times = cx.value(block, "TIMES", Slot::Free)?;
    let body = cx.statements(block, "DO")?;
    Ok(Emitted::statement(format!(
        "for count = 1, {times} do\n{body}end\n"
    )))
}

fn while_until(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let header = if cx.field(block, "MODE") == "UNTIL" {
        let condition = cx.value(block, "BOOL", Slot::Operand(Operator::Not))?;
        format!("while not {condition} do")
    } else {
        let condition = cx.value(block, "BOOL", Slot::Free)?;
        format!("while {condition} do")
    };
    let body = cx.statements(block, "DO")?;
    Ok(Emitted::statement(format!("{header}\n{body}end\n")))
}

fn count_loop(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let var = lua::identifier(&cx.field(block, "VAR"));
    let from = cx.value(block, "FROM", Slot::Free)?;
    let to = cx.value(block, "TO", Slot::Free)?;
    let by = cx.value(block, "BY", Slot::Free)?;
    let body = cx.statements(block, "DO")?;
    let header = if by == "1" {
        format!("for {var} = {from}, {to} do")
    } else {
        format!("for {var} = {from}, {to}, {by} do")
    };
    Ok(Emitted::statement(format!("{header}\n{body}end\n")))
}

fn for_each(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let var = lua::identifier(&cx.field(block, "VAR"));
    let list = cx.value(block, "LIST", Slot::Free)?;
    let body = cx.statements(block, "DO")?;
    Ok(Emitted::statement(format!(
        "for _, {var} in ipairs({list}) do\n{body}end\n"
    )))
}

fn math_number(block: &Block, _cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let value = block
        .field("NUM")
        .and_then(|v| v.as_number())
        .unwrap_or(0.0);
    let strength = if value < 0.0 {
        Strength::Unary
    } else {
        Strength::Atomic
    };
    Ok(Emitted::expression(lua::number(value), strength))
}

fn math_arithmetic(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let op = match cx.field(block, "OP").as_str() {
        "MINUS" => Operator::Sub,
        "MULTIPLY" => Operator::Mul,
        "DIVIDE" => Operator::Div,
        "POWER" => Operator::Pow,
        _ => Operator::Add,
    };
    binary(block, cx, op, None)
}

fn math_modulo(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let dividend = cx.value(block, "DIVIDEND", Slot::Left(Operator::Mod))?;
    let divisor = cx.value(block, "DIVISOR", Slot::Right(Operator::Mod))?;
    Ok(Emitted::expression(
        format!("{dividend} % {divisor}"),
        Strength::Multiplicative,
    ))
}

fn math_constrain(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let value = cx.value(block, "VALUE", Slot::Free)?;
    let low = cx.value(block, "LOW", Slot::Free)?;
    let high = cx.value(block, "HIGH", Slot::Free)?;
    Ok(Emitted::atom(format!(
        "math.min(math.max({value}, {low}), {high})"
    )))
}

fn math_random_int(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let from = cx.value(block, "FROM", Slot::Free)?;
    let to = cx.value(block, "TO", Slot::Free)?;
    Ok(Emitted::atom(format!("math.random({from}, {to})")))
}

fn text(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    Ok(Emitted::atom(cx.quoted_field(block, "TEXT")))
}

fn text_length(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let value = cx.value(block, "VALUE", Slot::Operand(Operator::Len))?;
    Ok(Emitted::expression(format!("#{value}"), Strength::Unary))
}

/// 1-based position of `FIND` in `VALUE`, or 0 when it does not occur.
fn text_index_of(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let text = cx.value(block, "VALUE", Slot::Free)?;
    let find = cx.value(block, "FIND", Slot::Free)?;
    if cx.field(block, "END") == "LAST" {
        // string.find has no reverse search; keep the last plain match.
        return Ok(Emitted::atom(format!(
            "(function(s, f) local last, i = 0, 0 repeat i = string.find(s, f, i + 1, true) \
             if i then last = i end until not i return last end)({text}, {find})"
        )));
    }
    Ok(Emitted::expression(
        format!("string.find({text}, {find}, 1, true) or 0"),
        Strength::Or,
    ))
}

fn text_char_at(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let text = cx.value(block, "VALUE", Slot::Free)?;
    let index = match cx.field(block, "WHERE").as_str() {
        "FIRST" => "1".to_string(),
        "LAST" => "-1".to_string(),
        "FROM_END" => {
            // Anything but an atom is grouped, so `-` never meets a leading `-` and opens a comment.
            let at = cx.value(block, "AT", Slot::Callee)?;
            format!("-{at}")
        }
        _ => cx.value(block, "AT", Slot::Free)?,
    };
    Ok(Emitted::atom(format!("string.sub({text}, {index}, {index})")))
}

fn variables_get(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    Ok(Emitted::atom(lua::identifier(&cx.field(block, "VAR"))))
}

fn variables_set(block: &Block, cx: &mut Emitter<'_>) -> Result<Emitted, GrammarError> {
    let var = lua::identifier(&cx.field(block, "VAR"));
    let value = cx.value(block, "VALUE", Slot::Free)?;
    Ok(Emitted::statement(format!("{var} = {value}\n")))
}
