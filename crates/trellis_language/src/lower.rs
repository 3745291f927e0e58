//! Lowering from s-expressions to [`Production`] values.
//!
//! The surface shape:
//!
//! ```text
//! (define-prdt NAME
//!   (when
//!     (for-string foo (eq $$ "BAR"))
//!     (for-struct x (fields (Color string) (Rank int))
//!       (eq Color "red")
//!       (less Rank 3)))
//!   (where
//!     (eq (x On) (foo $$))
//!     (not (eq (x On) (table $$))))
//!   #:desc "optional, informational only")
//! ```
//!
//! `when` declares the aliases, `where` holds cross-alias join tests, and
//! `not` negates a join test. The `#:desc` option is accepted and
//! discarded; only the emitted [`Production`] is contractual.

use std::collections::HashMap;

use trellis_engine::{AliasDeclaration, Guard, JoinTest, Production, Selector};
use trellis_foundation::{Error, Result, TestOp, TypeInfo, Value, VariantTag, FIELD_SELF};

use crate::parser::SExpr;
use crate::token::Span;

/// Lowers parsed top-level forms into productions.
///
/// # Errors
/// Fails on any form that is not a well-formed `define-prdt`.
pub fn lower(forms: &[SExpr]) -> Result<Vec<Production>> {
    forms.iter().map(lower_definition).collect()
}

fn err(span: Span, message: impl Into<String>) -> Error {
    Error::parse(message, span.line, span.column)
}

fn lower_definition(form: &SExpr) -> Result<Production> {
    let SExpr::List(items, span) = form else {
        return Err(err(form.span(), "expected a `(define-prdt …)` form"));
    };
    let mut items = items.iter();
    match items.next().and_then(SExpr::as_symbol) {
        Some("define-prdt") => {}
        _ => return Err(err(*span, "expected `define-prdt`")),
    }
    let name = match items.next() {
        Some(SExpr::Symbol(name, _)) => name.clone(),
        other => {
            let at = other.map_or(*span, SExpr::span);
            return Err(err(at, "expected a production name"));
        }
    };

    let mut production = Production::new(name);
    let mut saw_when = false;
    while let Some(clause) = items.next() {
        match clause {
            SExpr::List(body, clause_span) => {
                match body.first().and_then(SExpr::as_symbol) {
                    Some("when") => {
                        saw_when = true;
                        for decl in &body[1..] {
                            production.aliases.push(lower_alias(decl)?);
                        }
                    }
                    Some("where") => {
                        for test in &body[1..] {
                            production.join_tests.push(lower_join_test(test, false)?);
                        }
                    }
                    _ => {
                        return Err(err(*clause_span, "expected a `when` or `where` clause"));
                    }
                }
            }
            SExpr::Option(option, option_span) => {
                // Options take exactly one literal value; only `desc` is
                // known, and it is informational.
                let value = items.next().ok_or_else(|| {
                    err(*option_span, format!("option #:{option} needs a value"))
                })?;
                if option != "desc" {
                    return Err(err(*option_span, format!("unknown option #:{option}")));
                }
                if !matches!(value, SExpr::Str(_, _)) {
                    return Err(err(value.span(), "#:desc takes a string"));
                }
            }
            other => {
                return Err(err(other.span(), "unexpected form in define-prdt"));
            }
        }
    }

    if !saw_when {
        return Err(err(*span, "define-prdt needs a `when` clause"));
    }
    Ok(production)
}

fn lower_alias(form: &SExpr) -> Result<AliasDeclaration> {
    let SExpr::List(items, span) = form else {
        return Err(err(form.span(), "expected a `(for-TYPE alias …)` declaration"));
    };
    let head = items
        .first()
        .and_then(SExpr::as_symbol)
        .ok_or_else(|| err(*span, "expected a `for-TYPE` head"))?;
    let Some(kind) = head.strip_prefix("for-") else {
        return Err(err(*span, format!("expected `for-TYPE`, got `{head}`")));
    };

    let alias = match items.get(1) {
        Some(SExpr::Symbol(name, _)) => name.clone(),
        other => {
            let at = other.map_or(*span, |e| e.span());
            return Err(err(at, "expected an alias name"));
        }
    };

    let mut rest = &items[2..];
    let type_info = match kind {
        "nil" => TypeInfo::of_variant(VariantTag::Nil),
        "string" => TypeInfo::of_variant(VariantTag::String),
        "int" => TypeInfo::of_variant(VariantTag::Int),
        "uint" => TypeInfo::of_variant(VariantTag::Uint),
        "float" => TypeInfo::of_variant(VariantTag::Float),
        "bool" => TypeInfo::of_variant(VariantTag::Bool),
        "struct" => {
            let mut fields = HashMap::new();
            if let Some(SExpr::List(body, _)) = rest.first() {
                if body.first().and_then(SExpr::as_symbol) == Some("fields") {
                    for field in &body[1..] {
                        let (name, tag) = lower_field(field)?;
                        fields.insert(name, tag);
                    }
                    rest = &rest[1..];
                }
            }
            TypeInfo::of_struct(fields)
        }
        other => {
            return Err(err(*span, format!("unknown declaration type `{other}`")));
        }
    };

    let mut decl = AliasDeclaration::new(alias, type_info);
    for guard in rest {
        decl.guards.push(lower_guard(guard)?);
    }
    Ok(decl)
}

fn lower_field(form: &SExpr) -> Result<(String, VariantTag)> {
    let SExpr::List(items, span) = form else {
        return Err(err(form.span(), "expected a `(Name type)` field"));
    };
    let [SExpr::Symbol(name, _), tag] = items.as_slice() else {
        return Err(err(*span, "expected a `(Name type)` field"));
    };
    let tag = match tag.as_symbol() {
        Some("nil") => VariantTag::Nil,
        Some("string") => VariantTag::String,
        Some("int") => VariantTag::Int,
        Some("uint") => VariantTag::Uint,
        Some("float") => VariantTag::Float,
        Some("bool") => VariantTag::Bool,
        Some("struct") => VariantTag::Struct,
        Some("any") => VariantTag::Unknown,
        _ => return Err(err(tag.span(), "expected a field type")),
    };
    Ok((name.clone(), tag))
}

fn lower_guard(form: &SExpr) -> Result<Guard> {
    let SExpr::List(items, span) = form else {
        return Err(err(form.span(), "expected a `(op attr literal)` guard"));
    };
    let op = items
        .first()
        .and_then(SExpr::as_symbol)
        .ok_or_else(|| err(*span, "expected a guard operator"))?;
    let (op, negative) = lower_op(op).ok_or_else(|| {
        err(*span, format!("unknown guard operator `{op}`"))
    })?;

    let [_, attr, literal] = items.as_slice() else {
        return Err(err(*span, "guards take an attribute and a literal"));
    };
    Ok(Guard {
        attr: lower_attr(attr)?,
        value: lower_literal(literal)?,
        op,
        negative,
    })
}

fn lower_join_test(form: &SExpr, negated: bool) -> Result<JoinTest> {
    let SExpr::List(items, span) = form else {
        return Err(err(form.span(), "expected a join test"));
    };
    let head = items
        .first()
        .and_then(SExpr::as_symbol)
        .ok_or_else(|| err(*span, "expected a join operator"))?;

    if head == "not" {
        if negated {
            return Err(err(*span, "`not` does not nest"));
        }
        let [_, inner] = items.as_slice() else {
            return Err(err(*span, "`not` takes one join test"));
        };
        let mut test = lower_join_test(inner, true)?;
        test.negative = true;
        return Ok(test);
    }

    let (op, negative) = lower_op(head)
        .ok_or_else(|| err(*span, format!("unknown join operator `{head}`")))?;
    if negative {
        return Err(err(*span, "negate a join test with `not`"));
    }

    let mut selectors = Vec::with_capacity(items.len() - 1);
    for selector in &items[1..] {
        selectors.push(lower_selector(selector)?);
    }
    Ok(JoinTest {
        selectors,
        op,
        negative: false,
    })
}

fn lower_selector(form: &SExpr) -> Result<Selector> {
    let SExpr::List(items, span) = form else {
        return Err(err(form.span(), "expected an `(alias attr)` selector"));
    };
    let [SExpr::Symbol(alias, _), attr] = items.as_slice() else {
        return Err(err(*span, "expected an `(alias attr)` selector"));
    };
    Ok(Selector::new(alias.as_str(), lower_attr(attr)?))
}

fn lower_attr(form: &SExpr) -> Result<String> {
    match form {
        SExpr::SelfAttr(_) => Ok(FIELD_SELF.to_string()),
        SExpr::Symbol(name, _) => Ok(name.clone()),
        other => Err(err(other.span(), "expected an attribute or `$$`")),
    }
}

fn lower_literal(form: &SExpr) -> Result<Value> {
    match form {
        SExpr::Str(text, _) => Ok(Value::from(text.as_str())),
        SExpr::Int(n, _) => Ok(Value::Int(*n)),
        SExpr::Uint(n, _) => Ok(Value::Uint(*n)),
        SExpr::Float(n, _) => Ok(Value::Float(*n)),
        SExpr::Bool(b, _) => Ok(Value::Bool(*b)),
        SExpr::Symbol(name, _) if name == "nil" => Ok(Value::Nil),
        other => Err(err(other.span(), "expected a literal")),
    }
}

fn lower_op(name: &str) -> Option<(TestOp, bool)> {
    match name {
        "eq" => Some((TestOp::Equal, false)),
        "neq" => Some((TestOp::Equal, true)),
        "less" => Some((TestOp::Less, false)),
        "not-less" => Some((TestOp::Less, true)),
        _ => None,
    }
}
