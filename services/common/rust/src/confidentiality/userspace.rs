use std::fs::File;
use std::io::BufReader;
use std::result::Result as DefaultResult;

use serde_json::Value as JsnVal;

use super::AbstractConfidentiality;
use crate::error::{AppConfidentialityError, AppErrorCode};

// secrets are kept in one JSON document on local file system, owned by the
// OS user running this service, addressed by slash-separated path e.g.
// `backend_apps/databases/settlement_service`
pub struct UserSpaceConfidentiality {
    _fullpath: String,
}

impl UserSpaceConfidentiality {
    pub fn build(fullpath: String) -> Self {
        Self {
            _fullpath: fullpath,
        }
    }

    fn load_document(&self) -> DefaultResult<JsnVal, AppConfidentialityError> {
        let fileobj = File::open(self._fullpath.as_str()).map_err(|e| AppConfidentialityError {
            code: AppErrorCode::IOerror(e.kind()),
            detail: e.to_string(),
        })?;
        let reader = BufReader::new(fileobj);
        serde_json::from_reader::<BufReader<File>, JsnVal>(reader).map_err(|e| {
            AppConfidentialityError {
                code: AppErrorCode::InvalidJsonFormat,
                detail: e.to_string(),
            }
        })
    }
} // end of impl UserSpaceConfidentiality

impl AbstractConfidentiality for UserSpaceConfidentiality {
    fn try_get_payload(&self, id_: &str) -> DefaultResult<String, AppConfidentialityError> {
        let doc = self.load_document()?;
        let mut pointer = String::from("/");
        pointer += id_.trim_matches('/');
        let node = doc.pointer(pointer.as_str()).ok_or(AppConfidentialityError {
            code: AppErrorCode::MissingSecretPath,
            detail: format!("node-not-found: {id_}"),
        })?;
        let serial = match node {
            JsnVal::String(s) => serde_json::to_string(s),
            _others => serde_json::to_string(node),
        }
        .map_err(|e| AppConfidentialityError {
            code: AppErrorCode::InvalidJsonFormat,
            detail: e.to_string(),
        })?;
        Ok(serial)
    } // end of fn try_get_payload
}
