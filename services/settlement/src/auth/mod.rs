mod jwt;
mod keystore;

pub use jwt::{
    validate_jwt, AppAuthClaimPermission, AppAuthClaimQuota, AppAuthPermissionCode,
    AppAuthQuotaMatCode, AppAuthedClaim, AuthJwtError,
};
pub use keystore::{AbstractAuthKeystore, AppAuthKeystore, AuthKeystoreError};
