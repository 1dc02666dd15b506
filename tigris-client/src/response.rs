//! Response decoding for the bucket API

use tigris_core::{BucketMetadata, BucketUpdateResponse};

use crate::error::TigrisError;
use crate::transport::RawResponse;

/// Decode the answer to a bucket PATCH.
///
/// The body is decoded before the status is looked at. A 200 whose body does
/// not decode is a [`TigrisError::Decode`]; any other undecodable answer is
/// an [`TigrisError::Api`] carrying only the status. A decoded body counts as
/// success only with status 200 and an `Update` of `success` or
/// `not modified`.
pub fn decode_update_response(response: RawResponse) -> Result<(), TigrisError> {
    let decoded = serde_json::from_slice::<BucketUpdateResponse>(&response.body);

    match decoded {
        Ok(body) if response.status == 200 && body.is_success() => Ok(()),
        Ok(body) => Err(TigrisError::Api {
            status: response.status,
            code: non_empty(body.code),
            message: non_empty(body.message),
            request_id: response.request_id,
        }),
        Err(source) if response.status == 200 => Err(TigrisError::Decode {
            status: response.status,
            source,
        }),
        Err(_) => Err(status_only(response)),
    }
}

/// Decode the answer to `GET /{bucket}?metadata=`
pub fn decode_metadata(response: RawResponse) -> Result<BucketMetadata, TigrisError> {
    if response.status != 200 {
        return Err(match serde_json::from_slice::<BucketUpdateResponse>(&response.body) {
            Ok(body) => TigrisError::Api {
                status: response.status,
                code: non_empty(body.code),
                message: non_empty(body.message),
                request_id: response.request_id,
            },
            Err(_) => status_only(response),
        });
    }

    serde_json::from_slice(&response.body).map_err(|source| TigrisError::Decode {
        status: response.status,
        source,
    })
}

fn status_only(response: RawResponse) -> TigrisError {
    TigrisError::Api {
        status: response.status,
        code: None,
        message: None,
        request_id: response.request_id,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
