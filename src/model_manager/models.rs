use serde::Deserialize;

/// A photovoltaic plant as registered with Model-Manager.
#[derive(Debug, Clone, Deserialize)]
pub struct Plant {
    pub id: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub capacity: Option<f64>,
    #[serde(default)]
    pub elevation: Option<f64>,
}

impl Plant {
    /// A plant can only be forecast if both coordinates are known.
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Joblib,
    Pkl,
    Pickle,
    Zip,
}

/// Metadata describing one bound model. `features` is order-significant: it
/// defines the column order of the matrix handed to `predict`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelMetadata {
    pub id: i64,
    pub plant_id: i64,
    pub features: Vec<String>,
    pub file_type: FileType,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub plant_name: Option<String>,
    pub is_active: bool,
}
