//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de
//! configuración. La credencial del modelo de texto es opcional aquí:
//! se valida al construir el cliente, no al cargar la configuración,
//! para que los endpoints de lectura funcionen sin ella.

use std::env;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// API key del servicio de generación de texto (Gemini)
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_max_output_tokens: u32,
    /// Deadline para la llamada al modelo (etapa 2 del pipeline)
    pub generation_timeout_secs: u64,
    /// Rol destinatario de las notificaciones de reporte
    pub notification_role: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            gemini_api_key: env::var("GEMINI_API_KEY").ok(),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            gemini_max_output_tokens: env::var("GEMINI_MAX_OUTPUT_TOKENS")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()
                .expect("GEMINI_MAX_OUTPUT_TOKENS must be a valid number"),
            generation_timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .expect("GENERATION_TIMEOUT_SECS must be a valid number"),
            notification_role: env::var("NOTIFICATION_ROLE")
                .unwrap_or_else(|_| "admin".to_string()),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
