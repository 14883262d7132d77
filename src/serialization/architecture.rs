// --- Файл: src/serialization/architecture.rs ---

//! JSON-представление дерева архитектуры.

use crate::tree::{Node, Tree, TreeError};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Ошибки при сохранении и загрузке архитектуры
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Ошибка ввода/вывода: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Некорректное дерево: {0}")]
    InvalidTree(#[from] TreeError),
}

type Result<T> = std::result::Result<T, SerializationError>;

/// Сериализует дерево в форматированный JSON.
pub fn to_json_string(tree: &Tree) -> Result<String> {
    Ok(serde_json::to_string_pretty(tree.root())?)
}

/// Разбирает JSON и проверяет инварианты дерева.
pub fn from_json_str(json: &str) -> Result<Tree> {
    let root: Node = serde_json::from_str(json)?;
    Ok(Tree::new(root)?)
}

/// Сохраняет архитектуру в файл.
pub fn save_architecture<P: AsRef<Path>>(path: P, tree: &Tree) -> Result<()> {
    let json = to_json_string(tree)?;
    fs::write(path, json)?;
    Ok(())
}

/// Загружает архитектуру из файла.
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<Tree> {
    let json = fs::read_to_string(path)?;
    from_json_str(&json)
}
