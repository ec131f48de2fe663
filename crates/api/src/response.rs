use serde::Serialize;

/// Success envelope: every handler answers `{ "data": ... }`.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
