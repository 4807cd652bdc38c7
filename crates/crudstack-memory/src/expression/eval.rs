//! Evaluation of parsed expressions against one item.

use std::cmp::Ordering;
use std::collections::HashMap;

use crudstack_model::{AttributeValue, Item};

use super::ExpressionError;
use super::ast::{
    AttributePath, CompareOp, Expr, FunctionName, Operand, PathElement, PathValue, SetValue,
    UpdateExpr,
};

/// An item together with the request's placeholder maps.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The item under evaluation; empty when no item exists.
    pub item: &'a Item,
    /// `#name` to physical attribute name.
    pub names: &'a HashMap<String, String>,
    /// `:value` to attribute value.
    pub values: &'a HashMap<String, AttributeValue>,
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

impl EvalContext<'_> {
    /// Evaluates a condition to a boolean.
    ///
    /// Comparisons against a missing attribute are false.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` for an undefined placeholder or an operand
    /// of the wrong type.
    pub fn evaluate(&self, expr: &Expr) -> Result<bool, ExpressionError> {
        match expr {
            Expr::Compare { left, op, right } => {
                let (Some(l), Some(r)) = (self.operand(left)?, self.operand(right)?) else {
                    return Ok(false);
                };
                Ok(compare(&l, &r, *op))
            }
            Expr::Between { value, low, high } => {
                let (Some(v), Some(lo), Some(hi)) =
                    (self.operand(value)?, self.operand(low)?, self.operand(high)?)
                else {
                    return Ok(false);
                };
                Ok(compare(&v, &lo, CompareOp::Ge) && compare(&v, &hi, CompareOp::Le))
            }
            Expr::In { value, list } => {
                let Some(v) = self.operand(value)? else {
                    return Ok(false);
                };
                for candidate in list {
                    let found = self.operand(candidate)?;
                    if found.is_some_and(|c| compare(&v, &c, CompareOp::Eq)) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Expr::And(left, right) => Ok(self.evaluate(left)? && self.evaluate(right)?),
            Expr::Or(left, right) => Ok(self.evaluate(left)? || self.evaluate(right)?),
            Expr::Not(inner) => self.evaluate(inner).map(|b| !b),
            Expr::Function { name, args } => self.function(*name, args),
        }
    }

    fn function(&self, name: FunctionName, args: &[Operand]) -> Result<bool, ExpressionError> {
        let Some(Operand::Path(path)) = args.first() else {
            return Err(ExpressionError::InvalidOperand {
                operation: name.to_string(),
                message: "first argument must be an attribute path".to_owned(),
            });
        };
        let attr = self.path(path)?;
        let second = match args.get(1) {
            Some(arg) => self.operand(arg)?,
            None => None,
        };

        match name {
            FunctionName::AttributeExists => Ok(attr.is_some()),
            FunctionName::AttributeNotExists => Ok(attr.is_none()),
            FunctionName::AttributeType => match second {
                Some(AttributeValue::S(expected)) => {
                    Ok(attr.is_some_and(|a| a.type_descriptor() == expected))
                }
                _ => Err(ExpressionError::TypeMismatch {
                    message: "attribute_type expects a string type descriptor".to_owned(),
                }),
            },
            FunctionName::BeginsWith => match (attr, second) {
                (Some(AttributeValue::S(s)), Some(AttributeValue::S(prefix))) => {
                    Ok(s.starts_with(&prefix))
                }
                (Some(AttributeValue::B(b)), Some(AttributeValue::B(prefix))) => {
                    Ok(b.starts_with(&prefix))
                }
                (_, Some(AttributeValue::S(_) | AttributeValue::B(_))) => Ok(false),
                _ => Err(ExpressionError::TypeMismatch {
                    message: "begins_with expects a string or binary prefix".to_owned(),
                }),
            },
            FunctionName::Contains => Ok(match (attr, second) {
                (Some(AttributeValue::S(s)), Some(AttributeValue::S(sub))) => s.contains(&sub),
                (Some(AttributeValue::Ss(set)), Some(AttributeValue::S(v)))
                | (Some(AttributeValue::Ns(set)), Some(AttributeValue::N(v))) => set.contains(&v),
                (Some(AttributeValue::Bs(set)), Some(AttributeValue::B(v))) => set.contains(&v),
                (Some(AttributeValue::L(list)), Some(v)) => list.contains(&v),
                _ => false,
            }),
        }
    }

    /// Resolves an operand; `None` when it refers to a missing attribute.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` for an undefined placeholder.
    pub fn operand(&self, operand: &Operand) -> Result<Option<AttributeValue>, ExpressionError> {
        match operand {
            Operand::Value(name) => self
                .values
                .get(name)
                .cloned()
                .map(Some)
                .ok_or_else(|| ExpressionError::UnresolvedValue { name: name.clone() }),
            Operand::Path(path) => Ok(self.path(path)?.cloned()),
            Operand::Size(path) => Ok(self
                .path(path)?
                .and_then(attribute_size)
                .map(AttributeValue::number)),
        }
    }

    /// Walks a document path into the item.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::UnresolvedName` for an undefined `#name`.
    pub fn path(&self, path: &AttributePath) -> Result<Option<&AttributeValue>, ExpressionError> {
        let mut current: Option<&AttributeValue> = None;
        for (i, element) in path.elements.iter().enumerate() {
            current = match element {
                PathElement::Attribute(name) => {
                    let name = self.name(name)?;
                    if i == 0 {
                        self.item.get(name)
                    } else {
                        current.and_then(AttributeValue::as_m).and_then(|m| m.get(name))
                    }
                }
                PathElement::Index(idx) => current
                    .and_then(AttributeValue::as_l)
                    .and_then(|l| l.get(*idx)),
            };
            if current.is_none() {
                return Ok(None);
            }
        }
        Ok(current)
    }

    /// Resolves a path element's name through the attribute-name map.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::UnresolvedName` for an undefined `#name`.
    pub fn name<'n>(&'n self, name: &'n str) -> Result<&'n str, ExpressionError> {
        if name.starts_with('#') {
            self.names
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| ExpressionError::UnresolvedName {
                    name: name.to_owned(),
                })
        } else {
            Ok(name)
        }
    }

    fn top_name(&self, path: &AttributePath) -> Result<String, ExpressionError> {
        match (path.head(), path.is_top_level()) {
            (Some(head), true) => self.name(head).map(str::to_owned),
            _ => Err(ExpressionError::InvalidOperand {
                operation: "update".to_owned(),
                message: "only top-level attributes can be updated".to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

impl EvalContext<'_> {
    /// Applies an update to a copy of the item.
    ///
    /// Actions address top-level attributes. Every right-hand side is read
    /// from the item as it was before the update.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError` for an undefined placeholder, a nested
    /// target path, or operands of the wrong type.
    pub fn apply_update(&self, update: &UpdateExpr) -> Result<Item, ExpressionError> {
        let mut result = self.item.clone();

        for action in &update.set {
            let name = self.top_name(&action.path)?;
            let value = self.set_value(&action.value)?;
            result.insert(name, value);
        }
        for path in &update.remove {
            result.remove(&self.top_name(path)?);
        }
        for action in &update.add {
            self.add(&mut result, action)?;
        }
        for action in &update.delete {
            self.delete(&mut result, action)?;
        }
        Ok(result)
    }

    fn required(&self, operand: &Operand, operation: &str) -> Result<AttributeValue, ExpressionError> {
        self.operand(operand)?
            .ok_or_else(|| ExpressionError::InvalidOperand {
                operation: operation.to_owned(),
                message: "the operand refers to a missing attribute".to_owned(),
            })
    }

    fn set_value(&self, value: &SetValue) -> Result<AttributeValue, ExpressionError> {
        match value {
            SetValue::Operand(op) => self.required(op, "SET"),
            SetValue::Plus(a, b) => arithmetic(&self.required(a, "+")?, &self.required(b, "+")?, 1.0),
            SetValue::Minus(a, b) => {
                arithmetic(&self.required(a, "-")?, &self.required(b, "-")?, -1.0)
            }
            SetValue::IfNotExists(path, default) => match self.path(path)? {
                Some(existing) => Ok(existing.clone()),
                None => self.required(default, "if_not_exists"),
            },
            SetValue::ListAppend(a, b) => {
                match (self.required(a, "list_append")?, self.required(b, "list_append")?) {
                    (AttributeValue::L(mut first), AttributeValue::L(second)) => {
                        first.extend(second);
                        Ok(AttributeValue::L(first))
                    }
                    _ => Err(ExpressionError::TypeMismatch {
                        message: "list_append expects two lists".to_owned(),
                    }),
                }
            }
        }
    }

    fn add(&self, item: &mut Item, action: &PathValue) -> Result<(), ExpressionError> {
        let name = self.top_name(&action.path)?;
        let value = self.required(&action.value, "ADD")?;
        let merged = match (item.remove(&name), value) {
            (
                None,
                v @ (AttributeValue::N(_)
                | AttributeValue::Ss(_)
                | AttributeValue::Ns(_)
                | AttributeValue::Bs(_)),
            ) => v,
            (Some(existing @ AttributeValue::N(_)), v @ AttributeValue::N(_)) => {
                arithmetic(&existing, &v, 1.0)?
            }
            (Some(AttributeValue::Ss(set)), AttributeValue::Ss(extra)) => {
                AttributeValue::Ss(union(set, extra))
            }
            (Some(AttributeValue::Ns(set)), AttributeValue::Ns(extra)) => {
                AttributeValue::Ns(union(set, extra))
            }
            (Some(AttributeValue::Bs(set)), AttributeValue::Bs(extra)) => {
                AttributeValue::Bs(union(set, extra))
            }
            _ => {
                return Err(ExpressionError::TypeMismatch {
                    message: "ADD expects a number or a set matching the attribute".to_owned(),
                });
            }
        };
        item.insert(name, merged);
        Ok(())
    }

    fn delete(&self, item: &mut Item, action: &PathValue) -> Result<(), ExpressionError> {
        let name = self.top_name(&action.path)?;
        let value = self.required(&action.value, "DELETE")?;
        let Some(existing) = item.remove(&name) else {
            return Ok(());
        };
        let remaining = match (existing, value) {
            (AttributeValue::Ss(set), AttributeValue::Ss(gone)) => {
                non_empty(difference(set, &gone)).map(AttributeValue::Ss)
            }
            (AttributeValue::Ns(set), AttributeValue::Ns(gone)) => {
                non_empty(difference(set, &gone)).map(AttributeValue::Ns)
            }
            (AttributeValue::Bs(set), AttributeValue::Bs(gone)) => {
                non_empty(difference(set, &gone)).map(AttributeValue::Bs)
            }
            _ => {
                return Err(ExpressionError::TypeMismatch {
                    message: "DELETE expects a set matching the attribute".to_owned(),
                });
            }
        };
        if let Some(remaining) = remaining {
            item.insert(name, remaining);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

impl EvalContext<'_> {
    /// Keeps only the projected attributes. A nested path keeps its whole
    /// top-level attribute.
    ///
    /// # Errors
    ///
    /// Returns `ExpressionError::UnresolvedName` for an undefined `#name`.
    pub fn project(&self, paths: &[AttributePath]) -> Result<Item, ExpressionError> {
        let mut projected = Item::new();
        for path in paths {
            if self.path(path)?.is_none() {
                continue;
            }
            if let Some(head) = path.head() {
                let name = self.name(head)?;
                if let Some(value) = self.item.get(name) {
                    projected.insert(name.to_owned(), value.clone());
                }
            }
        }
        Ok(projected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Orders two values of the same scalar type. Numbers compare numerically.
#[must_use]
pub fn order(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AttributeValue::N(a), AttributeValue::N(b)) => {
            a.parse::<f64>().ok()?.partial_cmp(&b.parse::<f64>().ok()?)
        }
        (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.as_ref().cmp(b.as_ref())),
        (AttributeValue::Bool(a), AttributeValue::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn compare(left: &AttributeValue, right: &AttributeValue, op: CompareOp) -> bool {
    match op {
        CompareOp::Eq => order(left, right).map_or(left == right, Ordering::is_eq),
        CompareOp::Ne => order(left, right).map_or(left != right, Ordering::is_ne),
        CompareOp::Lt => order(left, right).is_some_and(Ordering::is_lt),
        CompareOp::Le => order(left, right).is_some_and(Ordering::is_le),
        CompareOp::Gt => order(left, right).is_some_and(Ordering::is_gt),
        CompareOp::Ge => order(left, right).is_some_and(Ordering::is_ge),
    }
}

fn arithmetic(
    left: &AttributeValue,
    right: &AttributeValue,
    sign: f64,
) -> Result<AttributeValue, ExpressionError> {
    let (Some(a), Some(b)) = (
        left.as_n().and_then(|n| n.parse::<f64>().ok()),
        right.as_n().and_then(|n| n.parse::<f64>().ok()),
    ) else {
        return Err(ExpressionError::TypeMismatch {
            message: "arithmetic expects two numbers".to_owned(),
        });
    };
    Ok(AttributeValue::N(format_number(sign.mul_add(b, a))))
}

/// Prints integral results without a fractional part.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn format_number(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        (v as i64).to_string()
    } else {
        v.to_string()
    }
}

fn attribute_size(value: &AttributeValue) -> Option<usize> {
    Some(match value {
        AttributeValue::S(s) => s.len(),
        AttributeValue::B(b) => b.len(),
        AttributeValue::Ss(v) | AttributeValue::Ns(v) => v.len(),
        AttributeValue::Bs(v) => v.len(),
        AttributeValue::L(v) => v.len(),
        AttributeValue::M(m) => m.len(),
        AttributeValue::N(_) | AttributeValue::Bool(_) | AttributeValue::Null(_) => return None,
    })
}

fn union<T: PartialEq>(mut set: Vec<T>, extra: Vec<T>) -> Vec<T> {
    for v in extra {
        if !set.contains(&v) {
            set.push(v);
        }
    }
    set
}

fn difference<T: PartialEq>(set: Vec<T>, gone: &[T]) -> Vec<T> {
    set.into_iter().filter(|v| !gone.contains(v)).collect()
}

fn non_empty<T>(set: Vec<T>) -> Option<Vec<T>> {
    (!set.is_empty()).then_some(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{parse_condition, parse_projection, parse_update};

    fn book() -> Item {
        Item::from([
            ("Author".to_owned(), AttributeValue::from("X")),
            ("Id".to_owned(), AttributeValue::number(10)),
            ("Title".to_owned(), AttributeValue::from("Rust in Action")),
            ("Tags".to_owned(), AttributeValue::Ss(vec!["a".to_owned(), "b".to_owned()])),
        ])
    }

    fn check(item: &Item, expr: &str, values: &[(&str, AttributeValue)]) -> bool {
        let names = HashMap::from([("#a".to_owned(), "Author".to_owned())]);
        let values: HashMap<String, AttributeValue> = values
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        let ctx = EvalContext {
            item,
            names: &names,
            values: &values,
        };
        ctx.evaluate(&parse_condition(expr).unwrap()).unwrap()
    }

    #[test]
    fn test_should_compare_numbers_numerically() {
        let item = book();
        assert!(check(&item, "Id > :n", &[(":n", AttributeValue::number(9))]));
        assert!(check(&item, "Id = :n", &[(":n", AttributeValue::N("10.0".to_owned()))]));
        assert!(!check(&item, "Id < :n", &[(":n", AttributeValue::number(2))]));
    }

    #[test]
    fn test_should_treat_missing_attribute_as_false() {
        let item = book();
        assert!(!check(&item, "Missing = :v", &[(":v", AttributeValue::from("x"))]));
        assert!(check(&item, "attribute_not_exists(Missing)", &[]));
    }

    #[test]
    fn test_should_resolve_name_placeholders() {
        let item = book();
        assert!(check(&item, "#a = :v AND attribute_exists(#a)", &[(":v", AttributeValue::from("X"))]));
    }

    #[test]
    fn test_should_fail_on_undefined_value() {
        let item = book();
        let names = HashMap::new();
        let values = HashMap::new();
        let ctx = EvalContext {
            item: &item,
            names: &names,
            values: &values,
        };
        let err = ctx
            .evaluate(&parse_condition("Title = :missing").unwrap())
            .unwrap_err();
        assert!(matches!(err, ExpressionError::UnresolvedValue { .. }));
    }

    #[test]
    fn test_should_evaluate_functions() {
        let item = book();
        assert!(check(&item, "begins_with(Title, :p)", &[(":p", AttributeValue::from("Rust"))]));
        assert!(check(&item, "contains(Tags, :t)", &[(":t", AttributeValue::from("b"))]));
        assert!(check(&item, "size(Title) = :n", &[(":n", AttributeValue::number(14))]));
        assert!(check(&item, "attribute_type(Tags, :t)", &[(":t", AttributeValue::from("SS"))]));
    }

    #[test]
    fn test_should_evaluate_between_and_in() {
        let item = book();
        assert!(check(
            &item,
            "Id BETWEEN :lo AND :hi",
            &[(":lo", AttributeValue::number(10)), (":hi", AttributeValue::number(20))]
        ));
        assert!(check(
            &item,
            "Author IN (:x, :y)",
            &[(":x", AttributeValue::from("Y")), (":y", AttributeValue::from("X"))]
        ));
    }

    #[test]
    fn test_should_apply_update_actions() {
        let item = book();
        let names = HashMap::new();
        let values = HashMap::from([
            (":one".to_owned(), AttributeValue::number(1)),
            (":t".to_owned(), AttributeValue::Ss(vec!["c".to_owned()])),
            (":gone".to_owned(), AttributeValue::Ss(vec!["a".to_owned()])),
            (":views".to_owned(), AttributeValue::number(5)),
        ]);
        let ctx = EvalContext {
            item: &item,
            names: &names,
            values: &values,
        };
        let update =
            parse_update("SET Id = Id + :one REMOVE Title ADD Views :views, Tags :t DELETE Tags :gone")
                .unwrap();
        let updated = ctx.apply_update(&update).unwrap();
        assert_eq!(updated["Id"], AttributeValue::number(11));
        assert!(!updated.contains_key("Title"));
        assert_eq!(updated["Views"], AttributeValue::number(5));
        assert_eq!(
            updated["Tags"],
            AttributeValue::Ss(vec!["b".to_owned(), "c".to_owned()])
        );
    }

    #[test]
    fn test_should_keep_existing_value_with_if_not_exists() {
        let item = book();
        let names = HashMap::new();
        let values = HashMap::from([(":t".to_owned(), AttributeValue::from("Other"))]);
        let ctx = EvalContext {
            item: &item,
            names: &names,
            values: &values,
        };
        let updated = ctx
            .apply_update(&parse_update("SET Title = if_not_exists(Title, :t), Sub = if_not_exists(Sub, :t)").unwrap())
            .unwrap();
        assert_eq!(updated["Title"], AttributeValue::from("Rust in Action"));
        assert_eq!(updated["Sub"], AttributeValue::from("Other"));
    }

    #[test]
    fn test_should_project_top_level_attributes() {
        let item = book();
        let names = HashMap::from([("#a".to_owned(), "Author".to_owned())]);
        let values = HashMap::new();
        let ctx = EvalContext {
            item: &item,
            names: &names,
            values: &values,
        };
        let projected = ctx
            .project(&parse_projection("#a, Title, Missing").unwrap())
            .unwrap();
        assert_eq!(projected.len(), 2);
        assert!(projected.contains_key("Author"));
    }
}
