//! Blocking HTTP implementation of the [`Api`] trait.
//!
//! Bearer token travels in default headers; every request carries a
//! timeout. Non-2xx responses are mapped through the server's
//! `error`/`message` JSON keys with a generic fallback, and 404 becomes
//! [`Error::NotFound`].

use std::time::Duration;

use reqwest::blocking::multipart;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use batchline_core::deletion::DeleteKey;
use batchline_core::record::{EquipmentRecord, MaterialPayload, MaterialRecord, QualityRecord};
use batchline_core::schema::{ProcessSegment, RecordFieldsResponse, SegmentDefinitions};
use batchline_core::{Batch, Error, RecordSubmission};

use crate::api::{Api, BatchDetail, BatchUpdate, CreateBatchRequest, DuplicateBatchRequest};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpApi {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct DeletedResponse {
    #[serde(default)]
    deleted: u64,
}

impl HttpApi {
    pub fn new(server: &str, token: &str) -> Result<HttpApi, Error> {
        if server.is_empty() {
            return Err(Error::Validation("no server URL configured".to_string()));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        if !token.is_empty() {
            let value = format!("Bearer {token}");
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&value)
                    .map_err(|e| Error::Validation(format!("invalid token: {e}")))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(HttpApi {
            client,
            base_url: server.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T, Error> {
        let response = request.send().map_err(|e| Error::Network(e.to_string()))?;
        let response = check_status(response)?;
        response.json().map_err(|e| Error::Parse(e.to_string()))
    }

    fn send_no_body(&self, request: reqwest::blocking::RequestBuilder) -> Result<(), Error> {
        let response = request.send().map_err(|e| Error::Network(e.to_string()))?;
        check_status(response)?;
        Ok(())
    }

    fn multipart_form(submission: &RecordSubmission) -> Result<multipart::Form, Error> {
        let payload = serde_json::to_string(&submission.payload)
            .map_err(|e| Error::Parse(e.to_string()))?;
        let existing = serde_json::to_string(&submission.existing_attachments)
            .map_err(|e| Error::Parse(e.to_string()))?;

        let mut form = multipart::Form::new()
            .text("payload", payload)
            .text("existing_attachments", existing);
        for path in &submission.files {
            form = form.file("attachments", path).map_err(|e| {
                Error::Validation(format!("cannot read attachment {}: {e}", path.display()))
            })?;
        }
        Ok(form)
    }

    fn submit_multipart(
        &self,
        path: &str,
        record_id: Option<i64>,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error> {
        let form = Self::multipart_form(submission)?;
        let request = match record_id {
            Some(id) => self.client.put(self.url(&format!("{path}/{id}"))),
            None => self.client.post(self.url(path)),
        };
        self.send(request.multipart(form))
    }
}

/// Map non-success responses to the error taxonomy, extracting the
/// server's message when the body carries one.
fn check_status(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .ok()
        .and_then(|body| {
            body.get("error")
                .or_else(|| body.get("message"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "operation failed".to_string());

    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(message));
    }
    Err(Error::Api {
        status: status.as_u16(),
        message,
    })
}

impl Api for HttpApi {
    fn list_batches(&self) -> Result<Vec<Batch>, Error> {
        self.send(self.client.get(self.url("/api/batches")))
    }

    fn batch_detail(&self, batch_id: i64) -> Result<BatchDetail, Error> {
        self.send(self.client.get(self.url(&format!("/api/batches/{batch_id}"))))
    }

    fn create_batch(&self, request: &CreateBatchRequest) -> Result<Batch, Error> {
        self.send(self.client.post(self.url("/api/batches")).json(request))
    }

    fn update_batch(&self, batch_id: i64, update: &BatchUpdate) -> Result<Batch, Error> {
        self.send(
            self.client
                .put(self.url(&format!("/api/batches/{batch_id}")))
                .json(update),
        )
    }

    fn delete_batch(&self, batch_id: i64) -> Result<(), Error> {
        self.send_no_body(self.client.delete(self.url(&format!("/api/batches/{batch_id}"))))
    }

    fn bulk_delete_batches(&self, key: &DeleteKey) -> Result<u64, Error> {
        let response: DeletedResponse = self.send(
            self.client
                .delete(self.url("/api/batches/delete"))
                .json(key),
        )?;
        Ok(response.deleted)
    }

    fn duplicate_batch(
        &self,
        batch_id: i64,
        request: &DuplicateBatchRequest,
    ) -> Result<Batch, Error> {
        self.send(
            self.client
                .post(self.url(&format!("/api/batches/{batch_id}/duplicate")))
                .json(request),
        )
    }

    fn process_segments(&self) -> Result<Vec<ProcessSegment>, Error> {
        self.send(self.client.get(self.url("/api/process_segments")))
    }

    fn segment_definitions(&self, segment: &str) -> Result<SegmentDefinitions, Error> {
        self.send(
            self.client
                .get(self.url("/api/segment_definitions"))
                .query(&[("segment", segment)]),
        )
    }

    fn record_fields(&self) -> Result<RecordFieldsResponse, Error> {
        self.send(self.client.get(self.url("/api/config/record_fields")))
    }

    fn list_materials(&self, batch_id: i64) -> Result<Vec<MaterialRecord>, Error> {
        self.send(
            self.client
                .get(self.url(&format!("/api/batches/{batch_id}/materials"))),
        )
    }

    fn create_material(
        &self,
        batch_id: i64,
        payload: &MaterialPayload,
    ) -> Result<serde_json::Value, Error> {
        self.send(
            self.client
                .post(self.url(&format!("/api/batches/{batch_id}/materials")))
                .json(payload),
        )
    }

    fn update_material(
        &self,
        batch_id: i64,
        record_id: i64,
        payload: &MaterialPayload,
    ) -> Result<serde_json::Value, Error> {
        self.send(
            self.client
                .put(self.url(&format!("/api/batches/{batch_id}/materials/{record_id}")))
                .json(payload),
        )
    }

    fn delete_material(&self, batch_id: i64, record_id: i64) -> Result<(), Error> {
        self.send_no_body(
            self.client
                .delete(self.url(&format!("/api/batches/{batch_id}/materials/{record_id}"))),
        )
    }

    fn list_equipment(&self, batch_id: i64) -> Result<Vec<EquipmentRecord>, Error> {
        self.send(
            self.client
                .get(self.url(&format!("/api/batches/{batch_id}/equipment"))),
        )
    }

    fn create_equipment(
        &self,
        batch_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error> {
        self.submit_multipart(&format!("/api/batches/{batch_id}/equipment"), None, submission)
    }

    fn update_equipment(
        &self,
        batch_id: i64,
        record_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error> {
        self.submit_multipart(
            &format!("/api/batches/{batch_id}/equipment"),
            Some(record_id),
            submission,
        )
    }

    fn delete_equipment(&self, batch_id: i64, record_id: i64) -> Result<(), Error> {
        self.send_no_body(
            self.client
                .delete(self.url(&format!("/api/batches/{batch_id}/equipment/{record_id}"))),
        )
    }

    fn list_quality(&self, batch_id: i64) -> Result<Vec<QualityRecord>, Error> {
        self.send(
            self.client
                .get(self.url(&format!("/api/batches/{batch_id}/quality"))),
        )
    }

    fn create_quality(
        &self,
        batch_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error> {
        self.submit_multipart(&format!("/api/batches/{batch_id}/quality"), None, submission)
    }

    fn update_quality(
        &self,
        batch_id: i64,
        record_id: i64,
        submission: &RecordSubmission,
    ) -> Result<serde_json::Value, Error> {
        self.submit_multipart(
            &format!("/api/batches/{batch_id}/quality"),
            Some(record_id),
            submission,
        )
    }

    fn delete_quality(&self, batch_id: i64, record_id: i64) -> Result<(), Error> {
        self.send_no_body(
            self.client
                .delete(self.url(&format!("/api/batches/{batch_id}/quality/{record_id}"))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let api = HttpApi::new("http://localhost:8080/", "").unwrap();
        assert_eq!(api.url("/api/batches"), "http://localhost:8080/api/batches");
    }

    #[test]
    fn test_empty_server_rejected() {
        assert!(matches!(HttpApi::new("", ""), Err(Error::Validation(_))));
    }

    #[test]
    fn test_multipart_form_rejects_unreadable_file() {
        let submission = RecordSubmission {
            payload: serde_json::json!({}),
            existing_attachments: vec![],
            files: vec!["/nonexistent/file.pdf".into()],
        };
        assert!(HttpApi::multipart_form(&submission).is_err());
    }
}
