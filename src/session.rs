//! Estado de sessão: o modelo ativo e os levantamentos do usuário
//!
//! A lista em memória é a fonte de verdade; toda mutação regrava a
//! lista inteira no armazenamento na hora (sobrescrita total, sem
//! tranca entre processos).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, Utc};
use log::debug;
use sha2::{Digest, Sha256};

use levantamento_common::{analyze, PhotoRef, Record, Schema};

use crate::error::{LevantamentoError, Result};
use crate::store::RecordStore;
use crate::template::TemplateOrigin;

/// Modelo carregado na sessão, identificado pelo digest dos bytes.
pub struct TemplateHandle {
    pub bytes: Vec<u8>,
    pub digest: String,
    pub origin: TemplateOrigin,
}

pub struct SessionState {
    user: String,
    records: Vec<Record>,
    template: Option<TemplateHandle>,
    schema: Option<Schema>,
    // Esquemas já analisados, por digest do modelo. Subir o mesmo
    // arquivo de novo não paga nova análise.
    schema_cache: HashMap<String, Schema>,
}

impl SessionState {
    pub fn new(user: impl Into<String>) -> Self {
        SessionState {
            user: user.into(),
            records: Vec::new(),
            template: None,
            schema: None,
            schema_cache: HashMap::new(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn template(&self) -> Option<&TemplateHandle> {
        self.template.as_ref()
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Carrega os levantamentos do usuário a partir do armazenamento.
    pub fn load_from(&mut self, store: &dyn RecordStore) -> Result<()> {
        self.records = store.load(&self.user)?;
        Ok(())
    }

    /// Ativa um modelo: analisa os bytes (ou reaproveita o esquema em
    /// cache) e descarta o modelo anterior.
    pub fn set_template(&mut self, bytes: Vec<u8>, origin: TemplateOrigin) -> Result<()> {
        let digest = hex::encode(Sha256::digest(&bytes));
        let schema = match self.schema_cache.get(&digest) {
            Some(cached) => {
                debug!("esquema reaproveitado do cache para o modelo {digest}");
                cached.clone()
            }
            None => {
                let schema = analyze(&bytes)?;
                self.schema_cache.insert(digest.clone(), schema.clone());
                schema
            }
        };
        self.schema = Some(schema);
        self.template = Some(TemplateHandle {
            bytes,
            digest,
            origin,
        });
        Ok(())
    }

    /// Cria um levantamento carimbado com id, data e responsável, e
    /// persiste a lista inteira. Retorna o id gerado.
    pub fn add_record(
        &mut self,
        store: &mut dyn RecordStore,
        installation_code: &str,
        equipment_type: &str,
        field_values: BTreeMap<String, String>,
        photos: Vec<PhotoRef>,
    ) -> Result<String> {
        let schema = self
            .schema
            .as_ref()
            .ok_or(LevantamentoError::MissingTemplate)?;
        if schema.sheet(equipment_type).is_none() {
            return Err(
                levantamento_common::Error::EquipmentTypeMismatch(equipment_type.to_string())
                    .into(),
            );
        }

        let now = now_brasilia();
        let record = Record {
            id: now.format("%Y%m%d%H%M%S").to_string(),
            installation_code: installation_code.trim().to_string(),
            equipment_type: equipment_type.to_string(),
            recorded_at: now.format("%d/%m/%Y %H:%M:%S").to_string(),
            responsible: self.user.clone(),
            fields: field_values,
            photos,
        };
        let id = record.id.clone();

        self.records.push(record);
        store.save(&self.user, &self.records)?;
        Ok(id)
    }

    /// Remove um levantamento pela posição na lista (0-based).
    pub fn remove_record(&mut self, store: &mut dyn RecordStore, index: usize) -> Result<Record> {
        if index >= self.records.len() {
            return Err(LevantamentoError::Store(format!(
                "índice {index} fora da lista ({} levantamento(s))",
                self.records.len()
            )));
        }
        let removed = self.records.remove(index);
        store.save(&self.user, &self.records)?;
        Ok(removed)
    }

    /// Remove todos os levantamentos de uma unidade consumidora.
    /// Retorna quantos saíram.
    pub fn remove_by_installation(
        &mut self,
        store: &mut dyn RecordStore,
        code: &str,
    ) -> Result<usize> {
        let before = self.records.len();
        self.records.retain(|r| r.installation_code != code);
        let removed = before - self.records.len();
        if removed > 0 {
            store.save(&self.user, &self.records)?;
        }
        Ok(removed)
    }

    /// Apaga todos os levantamentos do usuário.
    pub fn clear_records(&mut self, store: &mut dyn RecordStore) -> Result<usize> {
        let removed = self.records.len();
        self.records.clear();
        store.save(&self.user, &self.records)?;
        Ok(removed)
    }
}

fn now_brasilia() -> DateTime<FixedOffset> {
    // UTC-3 fixo; o Brasil não tem horário de verão desde 2019.
    let brasilia = FixedOffset::west_opt(3 * 3600).expect("deslocamento constante");
    Utc::now().with_timezone(&brasilia)
}
