use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    Appointment, AppointmentChanges, AppointmentDetail, NewAppointment, NewProfessional, NewUser,
    Professional, ProfessionalChanges, User, UserChanges,
};
use crate::database::repository::{
    constraints, AppointmentRepository, ProfessionalRepository, Store, TokenBlacklist,
    UserRepository,
};

/// In-process store with the same constraint semantics as the SQL schema:
/// unique usernames, user emails and professional emails, one appointment
/// per professional per instant, and cascade delete of appointments.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    professionals: BTreeMap<i64, Professional>,
    appointments: BTreeMap<i64, Appointment>,
    blacklist: HashMap<Uuid, DateTime<Utc>>,
    last_user_id: i64,
    last_professional_id: i64,
    last_appointment_id: i64,
}

fn unique(constraint: &str) -> DatabaseError {
    DatabaseError::UniqueViolation(constraint.to_string())
}

impl Tables {
    fn check_professional_email(&self, email: &str, except: Option<i64>) -> Result<(), DatabaseError> {
        let taken = self
            .professionals
            .values()
            .any(|p| p.email == email && Some(p.id) != except);
        if taken {
            return Err(unique(constraints::PROFISSIONAIS_EMAIL));
        }
        Ok(())
    }

    fn check_slot(
        &self,
        profissional_id: i64,
        data_hora: DateTime<Utc>,
        except: Option<i64>,
    ) -> Result<(), DatabaseError> {
        let taken = self.appointments.values().any(|a| {
            a.profissional_id == profissional_id && a.data_hora == data_hora && Some(a.id) != except
        });
        if taken {
            return Err(unique(constraints::CONSULTA_PROFISSIONAL_HORARIO));
        }
        Ok(())
    }

    fn check_professional_exists(&self, id: i64) -> Result<(), DatabaseError> {
        if !self.professionals.contains_key(&id) {
            // Mirrors the foreign key on consultas.profissional_id
            return Err(DatabaseError::NotFound(format!("Profissional {} not found", id)));
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn deactivate_user(&self, id: i64) {
        if let Some(user) = self.data.write().await.users.get_mut(&id) {
            user.is_active = false;
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut data = self.data.write().await;

        if data.users.values().any(|u| u.username == new_user.username) {
            return Err(unique(constraints::USERS_USERNAME));
        }
        if data.users.values().any(|u| u.email == new_user.email) {
            return Err(unique(constraints::USERS_EMAIL));
        }

        data.last_user_id += 1;
        let user = User {
            id: data.last_user_id,
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            is_active: true,
            date_joined: Utc::now(),
        };
        data.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.data.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self
            .data
            .read()
            .await
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(self.data.read().await.users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        Ok(self.data.read().await.users.values().any(|u| u.email == email))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError> {
        let mut data = self.data.write().await;
        let user = data
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))?;

        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl ProfessionalRepository for MemoryStore {
    async fn list_active_professionals(&self) -> Result<Vec<Professional>, DatabaseError> {
        let data = self.data.read().await;
        let mut professionals: Vec<Professional> =
            data.professionals.values().filter(|p| p.ativo).cloned().collect();
        professionals.sort_by(|a, b| a.nome.cmp(&b.nome).then(a.id.cmp(&b.id)));
        Ok(professionals)
    }

    async fn find_professional(&self, id: i64) -> Result<Option<Professional>, DatabaseError> {
        Ok(self.data.read().await.professionals.get(&id).cloned())
    }

    async fn create_professional(&self, new: NewProfessional) -> Result<Professional, DatabaseError> {
        let mut data = self.data.write().await;
        data.check_professional_email(&new.email, None)?;

        data.last_professional_id += 1;
        let now = Utc::now();
        let professional = Professional {
            id: data.last_professional_id,
            nome: new.nome,
            nome_social: new.nome_social,
            especialidade: new.especialidade,
            email: new.email,
            telefone: new.telefone,
            ativo: true,
            criado_em: now,
            atualizado_em: now,
        };
        data.professionals.insert(professional.id, professional.clone());
        Ok(professional)
    }

    async fn update_professional(
        &self,
        id: i64,
        changes: ProfessionalChanges,
    ) -> Result<Professional, DatabaseError> {
        let mut data = self.data.write().await;
        if !data.professionals.contains_key(&id) {
            return Err(DatabaseError::NotFound(format!("Profissional {} not found", id)));
        }
        if let Some(email) = &changes.email {
            data.check_professional_email(email, Some(id))?;
        }

        let professional = data
            .professionals
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Profissional {} not found", id)))?;

        if let Some(nome) = changes.nome {
            professional.nome = nome;
        }
        if let Some(nome_social) = changes.nome_social {
            professional.nome_social = nome_social;
        }
        if let Some(especialidade) = changes.especialidade {
            professional.especialidade = especialidade;
        }
        if let Some(email) = changes.email {
            professional.email = email;
        }
        if let Some(telefone) = changes.telefone {
            professional.telefone = telefone;
        }
        if let Some(ativo) = changes.ativo {
            professional.ativo = ativo;
        }
        professional.atualizado_em = Utc::now();

        Ok(professional.clone())
    }

    async fn delete_professional(&self, id: i64) -> Result<(), DatabaseError> {
        let mut data = self.data.write().await;
        if data.professionals.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(format!("Profissional {} not found", id)));
        }
        data.appointments.retain(|_, a| a.profissional_id != id);
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for MemoryStore {
    async fn list_appointments(
        &self,
        profissional_id: Option<i64>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let data = self.data.read().await;
        let mut appointments: Vec<Appointment> = data
            .appointments
            .values()
            .filter(|a| profissional_id.map_or(true, |id| a.profissional_id == id))
            .cloned()
            .collect();
        appointments.sort_by(|a, b| b.data_hora.cmp(&a.data_hora).then(b.id.cmp(&a.id)));
        Ok(appointments)
    }

    async fn find_appointment(&self, id: i64) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.data.read().await.appointments.get(&id).cloned())
    }

    async fn find_appointment_detail(
        &self,
        id: i64,
    ) -> Result<Option<AppointmentDetail>, DatabaseError> {
        let data = self.data.read().await;
        let Some(appointment) = data.appointments.get(&id) else {
            return Ok(None);
        };
        let Some(professional) = data.professionals.get(&appointment.profissional_id) else {
            return Ok(None);
        };

        Ok(Some(AppointmentDetail {
            id: appointment.id,
            profissional_id: professional.id,
            profissional_nome: professional.nome_exibicao().to_string(),
            profissional_especialidade: professional.especialidade.clone(),
            data_hora: appointment.data_hora,
            paciente_nome: appointment.paciente_nome.clone(),
            observacoes: appointment.observacoes.clone(),
            criado_em: appointment.criado_em,
            atualizado_em: appointment.atualizado_em,
        }))
    }

    async fn create_appointment(&self, new: NewAppointment) -> Result<Appointment, DatabaseError> {
        let mut data = self.data.write().await;
        data.check_professional_exists(new.profissional_id)?;
        data.check_slot(new.profissional_id, new.data_hora, None)?;

        data.last_appointment_id += 1;
        let now = Utc::now();
        let appointment = Appointment {
            id: data.last_appointment_id,
            profissional_id: new.profissional_id,
            paciente_nome: new.paciente_nome,
            data_hora: new.data_hora,
            observacoes: new.observacoes,
            criado_em: now,
            atualizado_em: now,
        };
        data.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Appointment, DatabaseError> {
        let mut data = self.data.write().await;
        let current = data
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(format!("Consulta {} not found", id)))?;

        let profissional_id = changes.profissional_id.unwrap_or(current.profissional_id);
        let data_hora = changes.data_hora.unwrap_or(current.data_hora);
        data.check_professional_exists(profissional_id)?;
        data.check_slot(profissional_id, data_hora, Some(id))?;

        let appointment = data
            .appointments
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("Consulta {} not found", id)))?;

        appointment.profissional_id = profissional_id;
        appointment.data_hora = data_hora;
        if let Some(paciente_nome) = changes.paciente_nome {
            appointment.paciente_nome = paciente_nome;
        }
        if let Some(observacoes) = changes.observacoes {
            appointment.observacoes = observacoes;
        }
        appointment.atualizado_em = Utc::now();

        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: i64) -> Result<(), DatabaseError> {
        if self.data.write().await.appointments.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(format!("Consulta {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenBlacklist for MemoryStore {
    async fn blacklist_token(
        &self,
        jti: Uuid,
        _user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let mut data = self.data.write().await;
        if data.blacklist.contains_key(&jti) {
            return Err(unique(constraints::TOKEN_BLACKLIST_JTI));
        }
        data.blacklist.insert(jti, expires_at);
        Ok(())
    }

    async fn is_blacklisted(&self, jti: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.data.read().await.blacklist.contains_key(&jti))
    }

    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, DatabaseError> {
        let mut data = self.data.write().await;
        let before = data.blacklist.len();
        data.blacklist.retain(|_, expires_at| *expires_at >= now);
        Ok((before - data.blacklist.len()) as u64)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn ready(&self) -> Result<bool, DatabaseError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn professional(email: &str) -> NewProfessional {
        NewProfessional {
            nome: "Maria Santos".to_string(),
            nome_social: None,
            especialidade: "Clínica Geral".to_string(),
            email: email.to_string(),
            telefone: "(21)88888-8888".to_string(),
        }
    }

    fn appointment(profissional_id: i64, data_hora: DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            profissional_id,
            paciente_nome: "Paciente A".to_string(),
            data_hora,
            observacoes: None,
        }
    }

    #[tokio::test]
    async fn enforces_unique_professional_email() {
        let store = MemoryStore::new();
        store.create_professional(professional("maria@teste.com")).await.unwrap();

        let err = store
            .create_professional(professional("maria@teste.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation(c) if c == constraints::PROFISSIONAIS_EMAIL));
    }

    #[tokio::test]
    async fn enforces_one_appointment_per_slot() {
        let store = MemoryStore::new();
        let prof = store.create_professional(professional("a@teste.com")).await.unwrap();
        let when = Utc::now() + Duration::days(1);

        store.create_appointment(appointment(prof.id, when)).await.unwrap();
        let err = store.create_appointment(appointment(prof.id, when)).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::UniqueViolation(c) if c == constraints::CONSULTA_PROFISSIONAL_HORARIO
        ));
    }

    #[tokio::test]
    async fn updating_an_appointment_keeps_its_own_slot() {
        let store = MemoryStore::new();
        let prof = store.create_professional(professional("a@teste.com")).await.unwrap();
        let when = Utc::now() + Duration::days(1);
        let created = store.create_appointment(appointment(prof.id, when)).await.unwrap();

        let updated = store
            .update_appointment(
                created.id,
                AppointmentChanges {
                    data_hora: Some(when),
                    observacoes: Some(Some("Retorno".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.observacoes.as_deref(), Some("Retorno"));
    }

    #[tokio::test]
    async fn deleting_professional_cascades() {
        let store = MemoryStore::new();
        let prof = store.create_professional(professional("a@teste.com")).await.unwrap();
        let other = store.create_professional(professional("b@teste.com")).await.unwrap();
        let when = Utc::now() + Duration::days(1);
        let gone = store.create_appointment(appointment(prof.id, when)).await.unwrap();
        let kept = store.create_appointment(appointment(other.id, when)).await.unwrap();

        store.delete_professional(prof.id).await.unwrap();

        assert!(store.find_appointment(gone.id).await.unwrap().is_none());
        assert!(store.find_appointment(kept.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn lists_most_recent_first_and_filters() {
        let store = MemoryStore::new();
        let prof = store.create_professional(professional("a@teste.com")).await.unwrap();
        let other = store.create_professional(professional("b@teste.com")).await.unwrap();
        let base = Utc::now() + Duration::days(1);

        store.create_appointment(appointment(prof.id, base)).await.unwrap();
        store.create_appointment(appointment(prof.id, base + Duration::hours(2))).await.unwrap();
        store.create_appointment(appointment(other.id, base + Duration::hours(1))).await.unwrap();

        let all = store.list_appointments(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].data_hora >= w[1].data_hora));

        let filtered = store.list_appointments(Some(prof.id)).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|a| a.profissional_id == prof.id));
    }

    #[tokio::test]
    async fn detail_uses_display_name() {
        let store = MemoryStore::new();
        let mut new = professional("a@teste.com");
        new.nome_social = Some("Joana".to_string());
        let prof = store.create_professional(new).await.unwrap();
        let created = store
            .create_appointment(appointment(prof.id, Utc::now() + Duration::days(1)))
            .await
            .unwrap();

        let detail = store.find_appointment_detail(created.id).await.unwrap().unwrap();
        assert_eq!(detail.profissional_nome, "Joana");
        assert_eq!(detail.profissional_especialidade, "Clínica Geral");
    }

    #[tokio::test]
    async fn blacklisting_twice_is_a_unique_violation() {
        let store = MemoryStore::new();
        let jti = Uuid::new_v4();
        let exp = Utc::now() + Duration::hours(1);

        store.blacklist_token(jti, 1, exp).await.unwrap();
        assert!(store.is_blacklisted(jti).await.unwrap());
        assert!(matches!(
            store.blacklist_token(jti, 1, exp).await,
            Err(DatabaseError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn purge_drops_only_expired_tokens() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let expired = Uuid::new_v4();
        let live = Uuid::new_v4();

        store.blacklist_token(expired, 1, now - Duration::minutes(5)).await.unwrap();
        store.blacklist_token(live, 1, now + Duration::hours(1)).await.unwrap();

        assert_eq!(store.purge_expired_tokens(now).await.unwrap(), 1);
        assert!(!store.is_blacklisted(expired).await.unwrap());
        assert!(store.is_blacklisted(live).await.unwrap());
        assert_eq!(store.purge_expired_tokens(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn inactive_professionals_are_not_listed() {
        let store = MemoryStore::new();
        let prof = store.create_professional(professional("a@teste.com")).await.unwrap();
        store
            .update_professional(
                prof.id,
                ProfessionalChanges {
                    ativo: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(store.list_active_professionals().await.unwrap().is_empty());
        assert!(store.find_professional(prof.id).await.unwrap().is_some());
    }
}
