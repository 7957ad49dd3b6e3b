use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub profissional_id: i64,
    pub paciente_nome: String,
    pub data_hora: DateTime<Utc>,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

/// Appointment joined with the owning professional's public fields
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AppointmentDetail {
    pub id: i64,
    pub profissional_id: i64,
    pub profissional_nome: String,
    pub profissional_especialidade: String,
    pub data_hora: DateTime<Utc>,
    pub paciente_nome: String,
    pub observacoes: Option<String>,
    pub criado_em: DateTime<Utc>,
    pub atualizado_em: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub profissional_id: i64,
    pub paciente_nome: String,
    pub data_hora: DateTime<Utc>,
    pub observacoes: Option<String>,
}

/// Partial update; `observacoes: Some(None)` clears the notes
#[derive(Debug, Clone, Default)]
pub struct AppointmentChanges {
    pub profissional_id: Option<i64>,
    pub paciente_nome: Option<String>,
    pub data_hora: Option<DateTime<Utc>>,
    pub observacoes: Option<Option<String>>,
}
