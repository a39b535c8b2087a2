use axum::{Json, extract::rejection::JsonRejection, response::IntoResponse};
use serde::Deserialize;

use portal_views::commission::{CommissionRates, CommissionReport, Employee, Sale};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompensationRequest {
    pub employees: Vec<Employee>,
    pub sales: Vec<Sale>,
    /// Defaults to 40% developer, 30% sales, 30% company.
    #[serde(default)]
    pub rates: CommissionRates,
}

pub async fn report(
    payload: Result<Json<CompensationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let report = CommissionReport::build(&req.employees, &req.sales, req.rates)?;
    Ok(Json(report))
}
