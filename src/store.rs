//! Persistence of assessment ledgers in sled
use std::sync::Arc;

use anyhow::Context;

use super::error::LedgerError;
use super::ledger::AssessmentLedger;

const LEDGER_TREE: &str = "assessments";

/// One cbor encoded ledger per assessment id
#[derive(Clone)]
pub struct AssessmentStore {
    ledgers: sled::Tree,
}

impl AssessmentStore {
    pub fn new(instance: &Arc<sled::Db>) -> anyhow::Result<Self> {
        Ok(Self {
            ledgers: instance.open_tree(LEDGER_TREE)?,
        })
    }

    pub fn load(&self, assessment_id: &str) -> anyhow::Result<AssessmentLedger> {
        let bytes = self
            .ledgers
            .get(assessment_id.as_bytes())?
            .ok_or_else(|| LedgerError::NotFound {
                kind: "Assessment",
                id: assessment_id.to_string(),
            })?;

        let ledger: AssessmentLedger = minicbor::decode(&bytes)
            .with_context(|| format!("failed to decode ledger for {assessment_id}"))?;
        Ok(ledger)
    }

    /// Loads the ledger or starts an empty one for a new assessment
    pub fn load_or_new(&self, assessment_id: &str) -> anyhow::Result<AssessmentLedger> {
        match self.ledgers.get(assessment_id.as_bytes())? {
            Some(_) => self.load(assessment_id),
            None => Ok(AssessmentLedger::new(assessment_id)),
        }
    }

    pub fn save(&self, ledger: &AssessmentLedger) -> anyhow::Result<()> {
        self.ledgers
            .insert(ledger.assessment_id.as_bytes(), minicbor::to_vec(ledger)?)?;
        self.ledgers.flush()?;
        Ok(())
    }

    pub fn list_assessments(&self) -> anyhow::Result<Vec<String>> {
        self.ledgers
            .iter()
            .keys()
            .map(|key| Ok::<_, anyhow::Error>(String::from_utf8(key?.to_vec())?))
            .collect()
    }
}
