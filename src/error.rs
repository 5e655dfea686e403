use std::io;
use thiserror::Error;

/// Ошибки конфигурации трассировки
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Коэффициент потерь вне (0, 1]
    #[error("Invalid loss factor for {name}: {value} (expected 0 < value <= 1)")]
    InvalidLoss { name: &'static str, value: f64 },

    /// Отрицательный или нечисловой допуск
    #[error("Invalid {name}: {value}")]
    InvalidTolerance { name: &'static str, value: f64 },

    /// Границы нулевого или отрицательного размера
    #[error("Invalid bounds: ({min_x}, {min_y}) - ({max_x}, {max_y})")]
    InvalidBounds {
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    },

    /// Переменную окружения не удалось разобрать
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Ошибки загрузки сцены
#[derive(Debug, Error)]
pub enum SceneError {
    /// Ошибка ввода-вывода
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Ошибка десериализации
    #[error("Scene parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// В сцене некорректная конфигурация трассировки
    #[error("Invalid trace configuration: {0}")]
    Config(#[from] ConfigError),
}
