//! HTTP client for the clinic server.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{ApiError, ApiResult, ClinicApi, InvoiceQuery, PatientQuery, VisitQuery};
use crate::config::DeskConfig;
use crate::models::{
    Doctor, Invoice, Listing, NewPatient, NewVisit, Patient, PaymentUpdate, Registration, Visit,
};

const PATIENTS: &str = "reception/patients/";
const REGISTER: &str = "reception/patients/register/";
const VISITS: &str = "reception/visits/";
const DOCTORS: &str = "users/management/doctors/";
const INVOICES: &str = "billing/invoices/";

/// [`ClinicApi`] over the clinic server's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: &DeskConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: normalize_base(config.api_url()),
            token: config.api_token().map(str::to_string),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> ApiResult<Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(path, error = %e, "request failed");
            if e.is_timeout() {
                ApiError::Transport(format!("request to {} timed out", path))
            } else {
                ApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        tracing::debug!(path, status = status.as_u16(), "response");

        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::NotFound(format!("{} ({})", path, body.trim())));
        }
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected(body.trim().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> ApiResult<T> {
        let response = self
            .send(self.request(Method::GET, path).query(params), path)
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    response
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Base URLs always end with a single slash so relative paths join cleanly.
fn normalize_base(url: &str) -> String {
    format!("{}/", url.trim().trim_end_matches('/'))
}

#[async_trait]
impl ClinicApi for HttpApi {
    async fn list_patients(&self, query: &PatientQuery) -> ApiResult<Listing<Patient>> {
        self.get_json(PATIENTS, &query.to_params()).await
    }

    async fn register_patient(&self, patient: &NewPatient) -> ApiResult<Registration> {
        let response = self
            .send(self.request(Method::POST, REGISTER).json(patient), REGISTER)
            .await?;

        // 200 returns the patient already registered under this phone number
        let existed = response.status() == StatusCode::OK;
        let patient: Patient = decode(response).await?;
        Ok(if existed {
            Registration::AlreadyExists(patient)
        } else {
            Registration::Created(patient)
        })
    }

    async fn list_visits(&self, query: &VisitQuery) -> ApiResult<Listing<Visit>> {
        self.get_json(VISITS, &query.to_params()).await
    }

    async fn create_visit(&self, visit: &NewVisit) -> ApiResult<Visit> {
        let response = self
            .send(self.request(Method::POST, VISITS).json(visit), VISITS)
            .await?;
        decode(response).await
    }

    async fn list_doctors(&self) -> ApiResult<Vec<Doctor>> {
        let listing: Listing<Doctor> = self.get_json(DOCTORS, &[]).await?;
        Ok(listing.results)
    }

    async fn list_invoices(&self, query: &InvoiceQuery) -> ApiResult<Listing<Invoice>> {
        self.get_json(INVOICES, &query.to_params()).await
    }

    async fn mark_invoice_paid(&self, invoice_id: &str) -> ApiResult<Invoice> {
        let path = format!("{}{}/", INVOICES, invoice_id);
        let response = self
            .send(
                self.request(Method::PATCH, &path).json(&PaymentUpdate::paid()),
                &path,
            )
            .await?;
        decode(response).await
    }
}
