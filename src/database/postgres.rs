use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    Appointment, AppointmentChanges, AppointmentDetail, NewAppointment, NewProfessional, NewUser,
    Professional, ProfessionalChanges, User, UserChanges,
};
use crate::database::repository::{
    constraints, AppointmentRepository, ProfessionalRepository, Store, TokenBlacklist,
    UserRepository,
};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, is_active, date_joined";

const PROFESSIONAL_COLUMNS: &str =
    "id, nome, nome_social, especialidade, email, telefone, ativo, criado_em, atualizado_em";

const APPOINTMENT_COLUMNS: &str =
    "id, profissional_id, paciente_nome, data_hora, observacoes, criado_em, atualizado_em";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let query = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(&new_user.first_name)
            .bind(&new_user.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists.0)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists.0)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError> {
        let query = format!(
            "UPDATE users
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_write)?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }
}

#[async_trait]
impl ProfessionalRepository for PgStore {
    async fn list_active_professionals(&self) -> Result<Vec<Professional>, DatabaseError> {
        let query = format!(
            "SELECT {PROFESSIONAL_COLUMNS} FROM profissionais WHERE ativo ORDER BY nome, id"
        );
        Ok(sqlx::query_as::<_, Professional>(&query)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, DatabaseError> {
        let query = format!("SELECT {PROFESSIONAL_COLUMNS} FROM profissionais WHERE id = $1");
        Ok(sqlx::query_as::<_, Professional>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_professional(&self, new: NewProfessional) -> Result<Professional, DatabaseError> {
        let query = format!(
            "INSERT INTO profissionais (nome, nome_social, especialidade, email, telefone)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {PROFESSIONAL_COLUMNS}"
        );

        sqlx::query_as::<_, Professional>(&query)
            .bind(&new.nome)
            .bind(&new.nome_social)
            .bind(&new.especialidade)
            .bind(&new.email)
            .bind(&new.telefone)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn update_professional(
        &self,
        id: i64,
        changes: ProfessionalChanges,
    ) -> Result<Professional, DatabaseError> {
        let query = format!(
            "UPDATE profissionais
             SET nome = COALESCE($2, nome),
                 nome_social = CASE WHEN $3 THEN $4 ELSE nome_social END,
                 especialidade = COALESCE($5, especialidade),
                 email = COALESCE($6, email),
                 telefone = COALESCE($7, telefone),
                 ativo = COALESCE($8, ativo),
                 atualizado_em = now()
             WHERE id = $1
             RETURNING {PROFESSIONAL_COLUMNS}"
        );

        let set_social = changes.nome_social.is_some();
        sqlx::query_as::<_, Professional>(&query)
            .bind(id)
            .bind(changes.nome)
            .bind(set_social)
            .bind(changes.nome_social.flatten())
            .bind(changes.especialidade)
            .bind(changes.email)
            .bind(changes.telefone)
            .bind(changes.ativo)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_write)?
            .ok_or_else(|| DatabaseError::NotFound(format!("Profissional {} not found", id)))
    }

    async fn delete_professional(&self, id: i64) -> Result<(), DatabaseError> {
        // consultas.profissional_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM profissionais WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Profissional {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for PgStore {
    async fn list_appointments(
        &self,
        profissional_id: Option<i64>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let query = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM consultas
             WHERE ($1::BIGINT IS NULL OR profissional_id = $1)
             ORDER BY data_hora DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Appointment>(&query)
            .bind(profissional_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, DatabaseError> {
        let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM consultas WHERE id = $1");
        Ok(sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_appointment_detail(
        &self,
        id: i64,
    ) -> Result<Option<AppointmentDetail>, DatabaseError> {
        let query = "
            SELECT c.id,
                   c.profissional_id,
                   COALESCE(NULLIF(TRIM(p.nome_social), ''), p.nome) AS profissional_nome,
                   p.especialidade AS profissional_especialidade,
                   c.data_hora,
                   c.paciente_nome,
                   c.observacoes,
                   c.criado_em,
                   c.atualizado_em
            FROM consultas c
            JOIN profissionais p ON p.id = c.profissional_id
            WHERE c.id = $1";

        Ok(sqlx::query_as::<_, AppointmentDetail>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, DatabaseError> {
        let query = format!(
            "INSERT INTO consultas (profissional_id, paciente_nome, data_hora, observacoes)
             VALUES ($1, $2, $3, $4)
             RETURNING {APPOINTMENT_COLUMNS}"
        );

        sqlx::query_as::<_, Appointment>(&query)
            .bind(new.profissional_id)
            .bind(&new.paciente_nome)
            .bind(new.data_hora)
            .bind(&new.observacoes)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_write)
    }

    async fn update_appointment(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Appointment, DatabaseError> {
        let query = format!(
            "UPDATE consultas
             SET profissional_id = COALESCE($2, profissional_id),
                 paciente_nome = COALESCE($3, paciente_nome),
                 data_hora = COALESCE($4, data_hora),
                 observacoes = CASE WHEN $5 THEN $6 ELSE observacoes END,
                 atualizado_em = now()
             WHERE id = $1
             RETURNING {APPOINTMENT_COLUMNS}"
        );

        let set_notes = changes.observacoes.is_some();
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(changes.profissional_id)
            .bind(changes.paciente_nome)
            .bind(changes.data_hora)
            .bind(set_notes)
            .bind(changes.observacoes.flatten())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_write)?
            .ok_or_else(|| DatabaseError::NotFound(format!("Consulta {} not found", id)))
    }

    async fn delete_appointment(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM consultas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Consulta {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenBlacklist for PgStore {
    async fn blacklist_token(
        &self,
        jti: Uuid,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO token_blacklist (jti, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(jti)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DatabaseError::from_write(e) {
                // Primary key collisions carry the index name; normalise it
                DatabaseError::UniqueViolation(_) => {
                    DatabaseError::UniqueViolation(constraints::TOKEN_BLACKLIST_JTI.to_string())
                }
                other => other,
            })?;
        Ok(())
    }

    async fn is_blacklisted(&self, jti: Uuid) -> Result<bool, DatabaseError> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }

    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn ready(&self) -> Result<bool, DatabaseError> {
        DatabaseManager::migrations_applied(&self.pool).await
    }
}
