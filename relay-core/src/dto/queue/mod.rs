//! Job queue poll DTOs

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::job::PolledJob;

/// Response of `POST /service/{serviceId}/task`
///
/// Only the path `data.serviceData.{jobId, data.dataInputs.body.content}` is
/// of interest; every layer defaults so that an empty response decodes to an
/// empty job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEnvelope {
    #[serde(deserialize_with = "null_default")]
    pub data: TaskEnvelopeData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskEnvelopeData {
    #[serde(rename = "serviceData", deserialize_with = "null_default")]
    pub service_data: ServiceData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceData {
    #[serde(rename = "jobId", deserialize_with = "null_default")]
    pub job_id: String,
    #[serde(deserialize_with = "null_default")]
    pub data: ServiceDataInputs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDataInputs {
    #[serde(rename = "dataInputs", deserialize_with = "null_default")]
    pub data_inputs: DataInputs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataInputs {
    #[serde(deserialize_with = "null_default")]
    pub body: DataBody,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataBody {
    #[serde(deserialize_with = "null_default")]
    pub content: String,
}

/// Decodes an explicit `null` the same as a missing field
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl TaskEnvelope {
    /// Wraps job content the way the queue does
    pub fn new(job_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            data: TaskEnvelopeData {
                service_data: ServiceData {
                    job_id: job_id.into(),
                    data: ServiceDataInputs {
                        data_inputs: DataInputs {
                            body: DataBody {
                                content: content.into(),
                            },
                        },
                    },
                },
            },
        }
    }

    pub fn into_job(self) -> PolledJob {
        let service_data = self.data.service_data;
        PolledJob {
            job_id: service_data.job_id,
            content: service_data.data.data_inputs.body.content,
        }
    }
}
