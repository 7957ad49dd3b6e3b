use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::models::{NewProfessional, Professional, ProfessionalChanges};
use crate::database::{constraints, DatabaseError, Store};
use crate::error::{ApiError, ApiResult};
use crate::validation::{self, nullable, FieldErrors};

const NOME_MAX: usize = 100;
const ESPECIALIDADE_MAX: usize = 70;
pub const NOT_FOUND: &str = "Profissional não encontrado.";
const DUPLICATE_EMAIL: &str = "Já existe um profissional com este email.";

/// Body of `POST /profissionais/` and `PATCH /profissionais/:id/`
#[derive(Debug, Default, Deserialize)]
pub struct ProfessionalInput {
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub nome_social: Option<Option<String>>,
    pub especialidade: Option<String>,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub ativo: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfessionalView {
    pub id: i64,
    pub nome: String,
    pub nome_social: Option<String>,
    pub nome_exibicao: String,
    pub especialidade: String,
    pub email: String,
    pub telefone: String,
    pub ativo: bool,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

impl From<Professional> for ProfessionalView {
    fn from(professional: Professional) -> Self {
        let nome_exibicao = professional.nome_exibicao().to_string();
        Self {
            id: professional.id,
            nome: professional.nome,
            nome_social: professional.nome_social,
            nome_exibicao,
            especialidade: professional.especialidade,
            email: professional.email,
            telefone: professional.telefone,
            ativo: professional.ativo,
            criado_em: professional.criado_em,
            atualizado_em: professional.atualizado_em,
        }
    }
}

pub struct ProfessionalService {
    store: Arc<dyn Store>,
}

impl ProfessionalService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ApiResult<Vec<ProfessionalView>> {
        let professionals = self.store.list_active_professionals().await?;
        Ok(professionals.into_iter().map(ProfessionalView::from).collect())
    }

    pub async fn get(&self, id: i64) -> ApiResult<ProfessionalView> {
        Ok(self.fetch(id).await?.into())
    }

    pub async fn create(&self, input: ProfessionalInput) -> ApiResult<ProfessionalView> {
        let new = validate_new(input)?;
        let created = self
            .store
            .create_professional(new)
            .await
            .map_err(duplicate_email)?;

        tracing::info!("Created professional {} ({})", created.id, created.especialidade);
        Ok(created.into())
    }

    /// Partial update; only submitted fields are validated and written
    pub async fn update(&self, id: i64, input: ProfessionalInput) -> ApiResult<ProfessionalView> {
        self.fetch(id).await?;

        let changes = validate_changes(input)?;
        let updated = self
            .store
            .update_professional(id, changes)
            .await
            .map_err(duplicate_email)?;

        Ok(updated.into())
    }

    /// Hard delete; the professional's appointments go with it
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.store.delete_professional(id).await?;
        tracing::info!("Deleted professional {} and its appointments", id);
        Ok(())
    }

    async fn fetch(&self, id: i64) -> ApiResult<Professional> {
        self.store
            .find_professional(id)
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }
}

fn validate_new(input: ProfessionalInput) -> Result<NewProfessional, FieldErrors> {
    let mut errors = FieldErrors::new();

    let nome = errors.require("nome", input.nome.as_deref(), clean_nome);
    let nome_social = match input.nome_social {
        Some(Some(value)) => errors.optional("nome_social", Some(value.as_str()), clean_nome_social),
        _ => None,
    };
    let especialidade = errors.require("especialidade", input.especialidade.as_deref(), clean_especialidade);
    let email = errors.require("email", input.email.as_deref(), validation::email);
    let telefone = errors.require("telefone", input.telefone.as_deref(), validation::phone);

    match (nome, especialidade, email, telefone) {
        (Some(nome), Some(especialidade), Some(email), Some(telefone)) if errors.is_empty() => {
            Ok(NewProfessional {
                nome,
                nome_social,
                especialidade,
                email,
                telefone,
            })
        }
        _ => Err(errors),
    }
}

fn validate_changes(input: ProfessionalInput) -> Result<ProfessionalChanges, FieldErrors> {
    let mut errors = FieldErrors::new();

    let changes = ProfessionalChanges {
        nome: errors.optional("nome", input.nome.as_deref(), clean_nome),
        nome_social: input.nome_social.map(|value| {
            value.and_then(|social| errors.optional("nome_social", Some(social.as_str()), clean_nome_social))
        }),
        especialidade: errors.optional("especialidade", input.especialidade.as_deref(), clean_especialidade),
        email: errors.optional("email", input.email.as_deref(), validation::email),
        telefone: errors.optional("telefone", input.telefone.as_deref(), validation::phone),
        ativo: input.ativo,
    };

    errors.into_result().map(|_| changes)
}

fn clean_nome(value: &str) -> Result<String, String> {
    validation::non_blank(value, NOME_MAX)
        .map_err(|e| blank_as("O nome não pode estar vazio.", e))
}

fn clean_nome_social(value: &str) -> Result<String, String> {
    validation::non_blank(value, NOME_MAX)
        .map_err(|e| blank_as("O nome social, se informado, não pode estar vazio.", e))
}

fn clean_especialidade(value: &str) -> Result<String, String> {
    validation::non_blank(value, ESPECIALIDADE_MAX)
        .map_err(|e| blank_as("A especialidade não pode estar vazia.", e))
}

/// Swap the generic blank message for a field-specific one
fn blank_as(message: &str, error: String) -> String {
    if error == validation::BLANK {
        message.to_string()
    } else {
        error
    }
}

fn duplicate_email(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::UniqueViolation(constraint) if constraint == constraints::PROFISSIONAIS_EMAIL => {
            ApiError::field_error("email", DUPLICATE_EMAIL)
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn input(nome: &str, email: &str) -> ProfessionalInput {
        ProfessionalInput {
            nome: Some(nome.to_string()),
            nome_social: None,
            especialidade: Some("Cardiologia".to_string()),
            email: Some(email.to_string()),
            telefone: Some("(11)99999-9999".to_string()),
            ativo: None,
        }
    }

    fn service() -> ProfessionalService {
        ProfessionalService::new(Arc::new(MemoryStore::new()))
    }

    fn field_errors(err: ApiError) -> FieldErrors {
        match err {
            ApiError::ValidationError { field_errors, .. } => field_errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn missing_fields_are_required() {
        let errors = validate_new(ProfessionalInput::default()).unwrap_err();
        for field in ["nome", "especialidade", "email", "telefone"] {
            assert_eq!(errors.get(field).unwrap(), [validation::REQUIRED], "{}", field);
        }
        assert!(!errors.contains("nome_social"));
    }

    #[test]
    fn blank_values_get_field_specific_messages() {
        let mut bad = input("   ", "ana@teste.com");
        bad.nome_social = Some(Some("  ".to_string()));
        bad.especialidade = Some("".to_string());
        bad.telefone = Some("123".to_string());

        let errors = validate_new(bad).unwrap_err();
        assert_eq!(errors.get("nome").unwrap(), ["O nome não pode estar vazio."]);
        assert!(errors.contains("nome_social"));
        assert!(errors.contains("especialidade"));
        assert!(errors.contains("telefone"));
        assert!(!errors.contains("email"));
    }

    #[test]
    fn values_are_trimmed() {
        let new = validate_new(input("  Ana Souza ", " ana@teste.com ")).unwrap();
        assert_eq!(new.nome, "Ana Souza");
        assert_eq!(new.email, "ana@teste.com");
    }

    #[test]
    fn explicit_null_clears_social_name_in_changes() {
        let changes = validate_changes(ProfessionalInput {
            nome_social: Some(None),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.nome_social, Some(None));
        assert!(changes.nome.is_none());
    }

    #[tokio::test]
    async fn view_includes_display_name() {
        let service = service();
        let mut with_social = input("João Silva", "joao@teste.com");
        with_social.nome_social = Some(Some("Joana".to_string()));

        let view = service.create(with_social).await.unwrap();
        assert_eq!(view.nome_exibicao, "Joana");
        assert!(view.ativo);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_field_error() {
        let service = service();
        service.create(input("Ana", "ana@teste.com")).await.unwrap();

        let err = service.create(input("Outra Ana", "ana@teste.com")).await.unwrap_err();
        assert_eq!(field_errors(err).get("email").unwrap(), [DUPLICATE_EMAIL]);
    }

    #[tokio::test]
    async fn update_of_missing_professional_is_not_found() {
        let err = service().update(999, ProfessionalInput::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn deactivated_professionals_leave_the_list() {
        let service = service();
        let ana = service.create(input("Ana", "ana@teste.com")).await.unwrap();
        service.create(input("Bruno", "bruno@teste.com")).await.unwrap();

        service
            .update(ana.id, ProfessionalInput { ativo: Some(false), ..Default::default() })
            .await
            .unwrap();

        let names: Vec<_> = service.list().await.unwrap().into_iter().map(|p| p.nome).collect();
        assert_eq!(names, ["Bruno"]);
        assert!(!service.get(ana.id).await.unwrap().ativo);
    }
}
