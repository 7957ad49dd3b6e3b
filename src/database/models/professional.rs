use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Professional {
    pub id: i64,
    pub nome: String,
    pub nome_social: Option<String>,
    pub especialidade: String,
    pub email: String,
    pub telefone: String,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl Professional {
    /// Social name when one is set, otherwise the legal name
    pub fn nome_exibicao(&self) -> &str {
        match self.nome_social.as_deref() {
            Some(social) if !social.trim().is_empty() => social,
            _ => &self.nome,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProfessional {
    pub nome: String,
    pub nome_social: Option<String>,
    pub especialidade: String,
    pub email: String,
    pub telefone: String,
}

/// Partial update; `nome_social: Some(None)` clears the social name
#[derive(Debug, Clone, Default)]
pub struct ProfessionalChanges {
    pub nome: Option<String>,
    pub nome_social: Option<Option<String>>,
    pub especialidade: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub ativo: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn professional(nome_social: Option<&str>) -> Professional {
        let now = Utc::now();
        Professional {
            id: 1,
            nome: "João Silva".to_string(),
            nome_social: nome_social.map(str::to_string),
            especialidade: "Psicologia".to_string(),
            email: "joao@teste.com".to_string(),
            telefone: "(11)99999-9999".to_string(),
            ativo: true,
            criado_em: now,
            atualizado_em: now,
        }
    }

    #[test]
    fn display_name_prefers_social_name() {
        assert_eq!(professional(Some("Joana")).nome_exibicao(), "Joana");
    }

    #[test]
    fn display_name_falls_back_to_legal_name() {
        assert_eq!(professional(None).nome_exibicao(), "João Silva");
        assert_eq!(professional(Some("")).nome_exibicao(), "João Silva");
    }
}
