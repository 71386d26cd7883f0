//! Health measurements and exercise prescriptions.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::api::http::HttpClient;
use crate::api::notify::Notifier;
use crate::api::types::{
  EntityId, Exercise, HealthRecord, ListPayload, NewHealthRecord, Prescription, PrescriptionStatus,
};
use crate::cache::{views, EntityCache, RelationIndex};
use crate::error::Result;
use crate::lifecycle::{Lifecycle, Operation, OperationStatus};

const FETCH_RECORDS: Operation = Operation::new("fetch_records", "Failed to load health data");
const FETCH_RECORD: Operation =
  Operation::new("fetch_record", "Failed to load health record details");
const ADD_RECORD: Operation =
  Operation::new("add_record", "Failed to add health data").announce("Health data added");
const UPDATE_RECORD: Operation =
  Operation::new("update_record", "Failed to update health data").announce("Health data updated");
const DELETE_RECORD: Operation =
  Operation::new("delete_record", "Failed to delete health data").announce("Health data deleted");
const FETCH_PRESCRIPTIONS: Operation =
  Operation::new("fetch_prescriptions", "Failed to load prescriptions");
const FETCH_PRESCRIPTION: Operation =
  Operation::new("fetch_prescription", "Failed to load prescription details");

pub struct HealthStore<H> {
  http: Arc<H>,
  records: EntityCache<HealthRecord>,
  prescriptions: EntityCache<Prescription>,
  /// Exercises per prescription, filled from prescription details.
  exercises: RelationIndex<Exercise>,
  lifecycle: Lifecycle,
}

impl<H: HttpClient> HealthStore<H> {
  pub fn new(http: Arc<H>, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      http,
      records: EntityCache::new(),
      prescriptions: EntityCache::new(),
      exercises: RelationIndex::new(),
      lifecycle: Lifecycle::new("health", notifier),
    }
  }

  pub fn status(&self) -> OperationStatus {
    self.lifecycle.status()
  }

  pub fn records(&self) -> Vec<HealthRecord> {
    self.records.list()
  }

  pub fn current_record(&self) -> Option<HealthRecord> {
    self.records.detail()
  }

  pub fn prescriptions(&self) -> Vec<Prescription> {
    self.prescriptions.list()
  }

  pub fn current_prescription(&self) -> Option<Prescription> {
    self.prescriptions.detail()
  }

  /// Most recent record by date. The cached order is left alone.
  pub fn latest_record(&self) -> Option<HealthRecord> {
    let records = self.records.list();
    views::latest_by(&records, |r| r.date.as_str()).cloned()
  }

  pub fn records_of_type(&self, kind: &str) -> Vec<HealthRecord> {
    views::filter_by(&self.records.list(), |r| r.kind == kind)
  }

  pub fn active_prescriptions(&self) -> Vec<Prescription> {
    views::filter_by(&self.prescriptions.list(), |p| {
      p.status == PrescriptionStatus::Active
    })
  }

  /// Exercises of a prescription whose detail has been fetched.
  pub fn exercises_of(&self, prescription: EntityId) -> Vec<Exercise> {
    self.exercises.children_of(prescription)
  }

  pub async fn fetch_records(&self) -> Result<Vec<HealthRecord>> {
    let call = self.http.get::<ListPayload<HealthRecord>>("/v1/health");
    self
      .lifecycle
      .run(FETCH_RECORDS, call, |payload| {
        let records = payload.into_vec();
        self.records.set_list(records.clone());
        records
      })
      .await
  }

  pub async fn fetch_record(&self, id: EntityId) -> Result<HealthRecord> {
    let path = format!("/v1/health/{}", id);
    self
      .lifecycle
      .run(FETCH_RECORD, self.http.get::<HealthRecord>(&path), |record| {
        self.records.set_detail(record.clone());
        record
      })
      .await
  }

  pub async fn add_record(&self, record: &NewHealthRecord) -> Result<HealthRecord> {
    let call = self.http.post::<HealthRecord, _>("/v1/health", record);
    self
      .lifecycle
      .run(ADD_RECORD, call, |created| {
        self.records.upsert_in_list(created.clone());
        created
      })
      .await
  }

  pub async fn update_record<P>(&self, id: EntityId, patch: &P) -> Result<HealthRecord>
  where
    P: Serialize + ?Sized,
  {
    let path = format!("/v1/health/{}", id);
    self
      .lifecycle
      .run(UPDATE_RECORD, self.http.put::<HealthRecord, _>(&path, patch), |updated| {
        self.records.upsert_in_list(updated.clone());
        updated
      })
      .await
  }

  pub async fn delete_record(&self, id: EntityId) -> Result<()> {
    let path = format!("/v1/health/{}", id);
    self
      .lifecycle
      .run(DELETE_RECORD, self.http.delete::<Value>(&path), |_| {
        self.records.evict(id);
      })
      .await
  }

  pub async fn fetch_prescriptions(&self) -> Result<Vec<Prescription>> {
    let call = self
      .http
      .get::<ListPayload<Prescription>>("/v1/prescriptions");
    self
      .lifecycle
      .run(FETCH_PRESCRIPTIONS, call, |payload| {
        let prescriptions = payload.into_vec();
        self.prescriptions.set_list(prescriptions.clone());
        prescriptions
      })
      .await
  }

  pub async fn fetch_prescription(&self, id: EntityId) -> Result<Prescription> {
    let path = format!("/v1/prescriptions/{}", id);
    self
      .lifecycle
      .run(FETCH_PRESCRIPTION, self.http.get::<Prescription>(&path), |prescription| {
        self
          .exercises
          .set_children(prescription.id, prescription.exercises.clone());
        self.prescriptions.set_detail(prescription.clone());
        prescription
      })
      .await
  }

  pub fn reset(&self) {
    self.records.clear();
    self.prescriptions.clear();
    self.exercises.clear();
    self.lifecycle.reset();
  }
}
