use crate::auth::{AuthError, Authenticator};
use tokio::sync::{mpsc, oneshot};

/// Depth of the request queue in front of the engine thread.
const ENGINE_QUEUE_DEPTH: usize = 16;

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Register {
        username: String,
        image: Vec<u8>,
        reply: oneshot::Sender<Result<(), AuthError>>,
    },
    Login {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<String, AuthError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
    threshold: f64,
}

impl EngineHandle {
    /// Enroll `username` with the face in `image` (encoded image bytes).
    pub async fn register(&self, username: String, image: Vec<u8>) -> Result<(), AuthError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Register { username, image, reply })
            .await
            .map_err(|_| AuthError::EngineUnavailable)?;
        rx.await.map_err(|_| AuthError::EngineUnavailable)?
    }

    /// Identify the user whose face is in `image`.
    pub async fn login(&self, image: Vec<u8>) -> Result<String, AuthError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Login { image, reply })
            .await
            .map_err(|_| AuthError::EngineUnavailable)?;
        rx.await.map_err(|_| AuthError::EngineUnavailable)?
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread owns the authenticator (and with it the inference sessions)
/// and serves requests one at a time until every handle is dropped.
pub fn spawn_engine(mut auth: Authenticator) -> std::io::Result<EngineHandle> {
    let threshold = auth.threshold();
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("facelogin-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Register { username, image, reply } => {
                        let result = auth.register(&username, &image);
                        if let Err(e) = &result {
                            tracing::info!(user = %username, error = %e, "registration rejected");
                        }
                        let _ = reply.send(result);
                    }
                    EngineRequest::Login { image, reply } => {
                        let result = auth.login(&image);
                        if let Err(e) = &result {
                            tracing::info!(error = %e, "login rejected");
                        }
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx, threshold })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::FakeEncoder;
    use facelogin_store::Store;

    #[tokio::test]
    async fn test_engine_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("users.db")).unwrap();
        let engine = spawn_engine(Authenticator::new(Box::new(FakeEncoder), store, 0.45)).unwrap();

        engine.register("alice".into(), b"0.0".to_vec()).await.unwrap();
        assert!(matches!(
            engine.register("alice".into(), b"0.0".to_vec()).await,
            Err(AuthError::DuplicateUsername(_))
        ));
        assert_eq!(engine.login(b"0.1".to_vec()).await.unwrap(), "alice");
        assert!(matches!(engine.login(b"noface".to_vec()).await, Err(AuthError::NoFaceDetected)));
        assert_eq!(engine.threshold(), 0.45);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("users.db")).unwrap();
        let engine = spawn_engine(Authenticator::new(Box::new(FakeEncoder), store.clone(), 0.45)).unwrap();

        let attempts = (0..8).map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.register("same".into(), b"1.0".to_vec()).await })
        });
        let mut successes = 0;
        for attempt in attempts.collect::<Vec<_>>() {
            if attempt.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(store.count_users().unwrap(), 1);
    }
}
