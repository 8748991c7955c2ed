// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `encryption.rs`

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::testing::{tenant_cluster, FakeEncrypter};

    #[tokio::test]
    async fn test_creates_key_once() {
        let encrypter = Arc::new(FakeEncrypter::default());
        let step = EncryptionKey::new(encrypter.clone());

        for _ in 0..2 {
            let mut ctx = ScratchContext::new();
            step.ensure_created(&tenant_cluster(), &mut ctx).await.unwrap();
            assert_eq!(
                ctx.status.tenant_cluster.encryption_key.as_deref(),
                Some("arn:aws:kms:eu-central-1:123456789012:key/abc12")
            );
        }

        assert_eq!(encrypter.keys.lock().unwrap().len(), 1);
    }
}
