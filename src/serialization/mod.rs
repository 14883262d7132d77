// --- Файл: src/serialization/mod.rs ---

//! Модуль для сохранения и загрузки архитектур.
//!
//! Архитектура (дерево узлов) хранится в JSON. Виды узлов записываются
//! строковыми идентификаторами, значения гиперпараметров помечены типом:
//!
//! ```json
//! {
//!   "name": "model",
//!   "kind": "hyperparameter",
//!   "options": { "num_units": { "int": 10 } },
//!   "children": [ { "name": "fc", "kind": "dense" } ]
//! }
//! ```
//!
//! # Примеры
//!
//! ```rust,ignore
//! use rustytree::serialization::{save_architecture, load_architecture};
//!
//! save_architecture("model.json", &tree)?;
//! let loaded = load_architecture("model.json")?;
//! ```

pub mod architecture;

pub use architecture::{from_json_str, load_architecture, save_architecture, to_json_string, SerializationError};
