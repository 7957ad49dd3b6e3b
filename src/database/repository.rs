use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Appointment, AppointmentChanges, AppointmentDetail, NewAppointment, NewProfessional, NewUser,
    Professional, ProfessionalChanges, User, UserChanges,
};

/// Constraint names reported through `DatabaseError::UniqueViolation`.
/// Both store implementations use the names from the SQL schema.
pub mod constraints {
    pub const USERS_USERNAME: &str = "users_username_key";
    pub const USERS_EMAIL: &str = "users_email_key";
    pub const PROFISSIONAIS_EMAIL: &str = "profissionais_email_key";
    pub const CONSULTA_PROFISSIONAL_HORARIO: &str = "unique_consulta_profissional_horario";
    pub const TOKEN_BLACKLIST_JTI: &str = "token_blacklist_pkey";
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError>;

    async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError>;

    /// Fails with `NotFound` when the user does not exist
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait ProfessionalRepository: Send + Sync {
    /// Active professionals ordered by name
    async fn list_active_professionals(&self) -> Result<Vec<Professional>, DatabaseError>;

    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, DatabaseError>;

    async fn create_professional(&self, new: NewProfessional) -> Result<Professional, DatabaseError>;

    async fn update_professional(
        &self,
        id: i64,
        changes: ProfessionalChanges,
    ) -> Result<Professional, DatabaseError>;

    /// Removes the professional together with all of its appointments
    async fn delete_professional(&self, id: i64) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Most recent first, optionally restricted to one professional
    async fn list_appointments(
        &self,
        profissional_id: Option<i64>,
    ) -> Result<Vec<Appointment>, DatabaseError>;

    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, DatabaseError>;

    async fn find_appointment_detail(
        &self,
        id: i64,
    ) -> Result<Option<AppointmentDetail>, DatabaseError>;

    async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, DatabaseError>;

    async fn update_appointment(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Appointment, DatabaseError>;

    async fn delete_appointment(&self, id: i64) -> Result<(), DatabaseError>;
}

/// Revoked refresh tokens
#[async_trait]
pub trait TokenBlacklist: Send + Sync {
    /// Fails with `UniqueViolation` when the token is already revoked
    async fn blacklist_token(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn is_blacklisted(&self, jti: Uuid) -> Result<bool, DatabaseError>;

    /// Drop entries whose token expired before `now`; returns how many went
    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError>;
}

/// Everything the HTTP layer needs from persistence
#[async_trait]
pub trait Store: UserRepository + ProfessionalRepository + AppointmentRepository + TokenBlacklist {
    /// Liveness probe
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Readiness probe: reachable and schema up to date
    async fn ready(&self) -> Result<bool, DatabaseError>;
}
