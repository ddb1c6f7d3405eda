//! Source fixtures

pub const HELLO_WORLD: &str = "\"Hello, World!\" -> display";

pub const VALUE_CONDITIONAL: &str = "c = true\nx = if c then 1 else 2\nx -> display";

pub const OBJECT_LUB_CONDITIONAL: &str = "c = true\nx = if c then 1 else \"a\"";

pub const MISSING_ELSE_CONDITIONAL: &str =
    "c = true\nx = if c then 1\nu = logix.events.update\nu -> x";

pub const MULTILINE_WITHOUT_END: &str = "c = true\nx = if c then 1\nelse 2\nx -> display";

pub const MULTILINE_WITH_END: &str = "c = true\nx = if c then 1\nelse 2\nend\nx -> display";

/// `for (i in from..to)` driven by an update event, logging `i` each pass
pub fn range_for(from: i64, to: i64) -> String {
    format!(
        "u = logix.events.update\nu -> for (i in {}..{}) {{\n  i -> logix.actions.log\n}}",
        from, to
    )
}

/// `n` independent `xI = I + I` chains, one inference component each
pub fn independent_sums(n: usize) -> String {
    (0..n)
        .map(|i| format!("x{i} = {i} + {i}\nx{i} -> display\n"))
        .collect()
}

/// An update event followed by `n` chained log actions
pub fn log_chain(n: usize) -> String {
    let mut source = String::from("u = logix.events.update\n");
    for i in 0..n {
        source.push_str(&format!("l{i} = logix.actions.log\n\"m{i}\" -> l{i}\n"));
    }
    source.push('u');
    for i in 0..n {
        source.push_str(&format!(" -> l{i}"));
    }
    source.push('\n');
    source
}

/// `x = 1 + 1 + ...` with `terms` operands
pub fn long_sum(terms: usize) -> String {
    let sum = vec!["1"; terms].join(" + ");
    format!("x = {sum}\nx -> display")
}

/// `depth` parentheses around a literal
pub fn nested_parens(depth: usize) -> String {
    format!("{}1{} -> display", "(".repeat(depth), ")".repeat(depth))
}
