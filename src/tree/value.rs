//! Значения гиперпараметров, которые узлы дерева объявляют локально.

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Локальные опции узла: имя гиперпараметра -> значение.
///
/// `BTreeMap` выбран ради детерминированного порядка при печати и сериализации.
pub type Options = BTreeMap<String, OptionValue>;

/// Значение гиперпараметра.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    /// Форма тензора; `None` обозначает неизвестную размерность (обычно batch).
    Shape(Vec<Option<usize>>),
    List(Vec<OptionValue>),
    Tensor(ArrayD<f32>),
}

impl OptionValue {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Float(_) => "float",
            OptionValue::Int(_) => "int",
            OptionValue::Bool(_) => "bool",
            OptionValue::Str(_) => "str",
            OptionValue::Shape(_) => "shape",
            OptionValue::List(_) => "list",
            OptionValue::Tensor(_) => "tensor",
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Shape view. A single non-negative integer is read as a square shape of rank 2,
    /// the way `filter_size=3` means `(3, 3)`.
    pub fn as_shape(&self) -> Option<Vec<Option<usize>>> {
        match self {
            OptionValue::Shape(dims) => Some(dims.clone()),
            OptionValue::Int(_) => self.as_usize().map(|d| vec![Some(d), Some(d)]),
            OptionValue::List(items) => items
                .iter()
                .map(|item| match item {
                    OptionValue::Int(_) => item.as_usize().map(Some),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn as_tensor(&self) -> Option<&ArrayD<f32>> {
        match self {
            OptionValue::Tensor(arr) => Some(arr),
            _ => None,
        }
    }

    /// Converts a free-form JSON value (as typed on the command line) into an option value.
    ///
    /// Integers stay integers, arrays of integers and `null` become shapes, any other
    /// array becomes a list. Objects have no option counterpart.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value as Json;
        match value {
            Json::Bool(b) => Some(OptionValue::Bool(*b)),
            Json::Number(n) => n
                .as_i64()
                .map(OptionValue::Int)
                .or_else(|| n.as_f64().map(OptionValue::Float)),
            Json::String(s) => Some(OptionValue::Str(s.clone())),
            Json::Array(items) => {
                let shape: Option<Vec<Option<usize>>> = items
                    .iter()
                    .map(|item| match item {
                        Json::Null => Some(None),
                        Json::Number(n) => n.as_u64().and_then(|d| usize::try_from(d).ok()).map(Some),
                        _ => None,
                    })
                    .collect();
                match shape {
                    Some(dims) => Some(OptionValue::Shape(dims)),
                    None => items
                        .iter()
                        .map(Self::from_json)
                        .collect::<Option<Vec<_>>>()
                        .map(OptionValue::List),
                }
            }
            Json::Null | Json::Object(_) => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Bool(v) => write!(f, "{}", v),
            OptionValue::Str(v) => write!(f, "{:?}", v),
            OptionValue::Shape(dims) => {
                let parts: Vec<String> = dims
                    .iter()
                    .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
                    .collect();
                write!(f, "({})", parts.join(", "))
            }
            OptionValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|item| item.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            OptionValue::Tensor(arr) => write!(f, "tensor{:?}", arr.shape()),
        }
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<f32> for OptionValue {
    fn from(v: f32) -> Self {
        OptionValue::Float(v as f64)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<usize> for OptionValue {
    fn from(v: usize) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

impl From<(usize, usize)> for OptionValue {
    fn from((h, w): (usize, usize)) -> Self {
        OptionValue::Shape(vec![Some(h), Some(w)])
    }
}

impl From<Vec<Option<usize>>> for OptionValue {
    fn from(dims: Vec<Option<usize>>) -> Self {
        OptionValue::Shape(dims)
    }
}

impl From<ArrayD<f32>> for OptionValue {
    fn from(arr: ArrayD<f32>) -> Self {
        OptionValue::Tensor(arr)
    }
}
