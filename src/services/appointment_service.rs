use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::database::models::{Appointment, AppointmentChanges, AppointmentDetail, NewAppointment};
use crate::database::{constraints, DatabaseError, Store};
use crate::error::{ApiError, ApiResult};
use crate::types::Shape;
use crate::validation::{self, nullable, FieldErrors};

const PACIENTE_NOME_MAX: usize = 100;
pub const NOT_FOUND: &str = "Consulta não encontrada.";
const SLOT_TAKEN: &str = "Este profissional já possui uma consulta agendada neste horário.";

/// Body of `POST /consultas/` and `PATCH /consultas/:id/`
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentInput {
    pub profissional_id: Option<i64>,
    pub paciente_nome: Option<String>,
    /// RFC 3339; parsed here so a bad value is reported on the field
    pub data_hora: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub observacoes: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    pub profissional_id: Option<String>,
}

/// Retrieve payload, rendered by the action's shape
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AppointmentView {
    Summary(Appointment),
    Detail(AppointmentDetail),
}

pub struct AppointmentService {
    store: Arc<dyn Store>,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Most recent first. A professional filter that matches nothing is a
    /// 404 so a mistyped id is not mistaken for an empty agenda.
    pub async fn list(&self, query: AppointmentQuery) -> ApiResult<Vec<Appointment>> {
        let filter = match query.profissional_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                ApiError::field_error("profissional_id", "Um número inteiro válido é exigido.")
            })?),
        };

        let appointments = self.store.list_appointments(filter).await?;
        if let Some(profissional_id) = filter {
            if appointments.is_empty() {
                return Err(ApiError::not_found(format!(
                    "Nenhuma consulta encontrada para o profissional {}.",
                    profissional_id
                )));
            }
        }

        Ok(appointments)
    }

    pub async fn get(&self, id: i64, shape: Shape) -> ApiResult<AppointmentView> {
        let view = match shape {
            Shape::AppointmentDetail => self
                .store
                .find_appointment_detail(id)
                .await?
                .map(AppointmentView::Detail),
            _ => self.store.find_appointment(id).await?.map(AppointmentView::Summary),
        };

        view.ok_or_else(not_found)
    }

    pub async fn create(&self, input: AppointmentInput) -> ApiResult<Appointment> {
        let mut errors = FieldErrors::new();

        let profissional_id = match input.profissional_id {
            Some(id) => self.existing_professional(id, &mut errors).await?,
            None => {
                errors.add("profissional_id", validation::REQUIRED);
                None
            }
        };
        let paciente_nome =
            errors.require("paciente_nome", input.paciente_nome.as_deref(), clean_paciente_nome);
        let data_hora = errors.require("data_hora", input.data_hora.as_deref(), future_data_hora);
        let observacoes = match input.observacoes {
            Some(Some(notes)) => errors.optional("observacoes", Some(notes.as_str()), clean_observacoes),
            _ => None,
        };

        let new = match (profissional_id, paciente_nome, data_hora) {
            (Some(profissional_id), Some(paciente_nome), Some(data_hora)) if errors.is_empty() => {
                NewAppointment {
                    profissional_id,
                    paciente_nome,
                    data_hora,
                    observacoes,
                }
            }
            _ => return Err(errors.into()),
        };

        let created = self
            .store
            .create_appointment(new)
            .await
            .map_err(slot_taken)?;

        tracing::info!(
            "Scheduled appointment {} with professional {} at {}",
            created.id,
            created.profissional_id,
            created.data_hora
        );
        Ok(created)
    }

    /// Partial update; only submitted fields are validated and written
    pub async fn update(&self, id: i64, input: AppointmentInput) -> ApiResult<Appointment> {
        if self.store.find_appointment(id).await?.is_none() {
            return Err(not_found());
        }

        let mut errors = FieldErrors::new();
        let profissional_id = match input.profissional_id {
            Some(profissional_id) => self.existing_professional(profissional_id, &mut errors).await?,
            None => None,
        };

        let changes = AppointmentChanges {
            profissional_id,
            paciente_nome: errors.optional(
                "paciente_nome",
                input.paciente_nome.as_deref(),
                clean_paciente_nome,
            ),
            data_hora: errors.optional("data_hora", input.data_hora.as_deref(), future_data_hora),
            observacoes: input.observacoes.map(|notes| {
                notes.and_then(|notes| {
                    errors.optional("observacoes", Some(notes.as_str()), clean_observacoes)
                })
            }),
        };
        errors.into_result()?;

        self.store
            .update_appointment(id, changes)
            .await
            .map_err(slot_taken)
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.store.delete_appointment(id).await?;
        tracing::info!("Deleted appointment {}", id);
        Ok(())
    }

    /// The id when the professional exists, otherwise a field error
    async fn existing_professional(&self, id: i64, errors: &mut FieldErrors) -> ApiResult<Option<i64>> {
        if self.store.find_professional(id).await?.is_some() {
            Ok(Some(id))
        } else {
            errors.add(
                "profissional_id",
                format!("Pk inválido \"{}\" - objeto não existe.", id),
            );
            Ok(None)
        }
    }
}

fn not_found() -> ApiError {
    ApiError::not_found(NOT_FOUND)
}

fn clean_paciente_nome(value: &str) -> Result<String, String> {
    validation::non_blank(value, PACIENTE_NOME_MAX).map_err(|e| {
        if e == validation::BLANK {
            "O nome do paciente não pode estar vazio.".to_string()
        } else {
            e
        }
    })
}

fn clean_observacoes(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Observações, se informadas, não podem estar vazias.".to_string());
    }
    Ok(trimmed.to_string())
}

fn future_data_hora(value: &str) -> Result<DateTime<Utc>, String> {
    let parsed = DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            "Formato inválido para data e hora. Use o formato ISO 8601 (AAAA-MM-DDThh:mm:ssZ)."
                .to_string()
        })?;

    if parsed < Utc::now() {
        return Err("Não é permitido cadastrar consultas para datas no passado.".to_string());
    }
    Ok(parsed)
}

fn slot_taken(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::UniqueViolation(constraint)
            if constraint == constraints::CONSULTA_PROFISSIONAL_HORARIO =>
        {
            let mut errors = FieldErrors::new();
            errors.add(FieldErrors::NON_FIELD, SLOT_TAKEN);
            errors.into()
        }
        other => other.into(),
    }
}
