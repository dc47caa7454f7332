pub mod models;
pub mod queries;
pub mod writer;

pub use models::{
    CycleMetricRow, CycleMetricTypeSql, ForecastRow, HorizonMetricRow, HorizonMetricTypeSql, MetricType,
    PowerReadingRow, PredictionRow,
};
pub use writer::PersistenceHandle;
