/// Tests for ReleaseQueue

use super::*;
use crate::backend::MockBackend;

#[test]
fn test_new_queue_is_empty() {
    let queue = ReleaseQueue::new();
    assert!(queue.is_empty());
    assert_eq!(queue.len(), 0);
    assert_eq!(queue.rejected_count(), 0);
    assert_eq!(queue.released_total(), 0);
}

#[test]
fn test_drain_releases_in_enqueue_order() {
    let mut backend = MockBackend::new();
    let queue = ReleaseQueue::new();
    let a = backend.create_handle(HandleKind::SceneNode).unwrap();
    let b = backend.create_handle(HandleKind::RenderData).unwrap();

    queue.push(b, HandleKind::RenderData).unwrap();
    queue.push(a, HandleKind::SceneNode).unwrap();

    assert_eq!(queue.drain(&mut backend).unwrap(), 2);
    assert_eq!(backend.destroyed, vec![b, a]);
    assert!(queue.is_empty());
    assert_eq!(queue.released_total(), 2);
}

#[test]
fn test_duplicate_push_is_rejected() {
    let mut backend = MockBackend::new();
    let queue = ReleaseQueue::new();
    let handle = backend.create_handle(HandleKind::Mesh).unwrap();

    queue.push(handle, HandleKind::Mesh).unwrap();
    let second = queue.push(handle, HandleKind::Mesh);

    assert!(matches!(second, Err(Error::LifecycleError(_))));
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.rejected_count(), 1);
}

#[test]
fn test_same_handle_after_drain_reaches_backend_error() {
    let mut backend = MockBackend::new();
    let queue = ReleaseQueue::new();
    let handle = backend.create_handle(HandleKind::Texture).unwrap();

    queue.push(handle, HandleKind::Texture).unwrap();
    queue.drain(&mut backend).unwrap();

    // The queue forgets drained handles; the backend flags the second release
    queue.push(handle, HandleKind::Texture).unwrap();
    let result = queue.drain(&mut backend);
    assert!(matches!(result, Err(Error::LifecycleError(_))));
    assert_eq!(backend.destroyed, vec![handle]);
}

#[test]
fn test_drain_continues_after_failure() {
    let mut backend = MockBackend::new();
    let queue = ReleaseQueue::new();
    let good = backend.create_handle(HandleKind::SceneNode).unwrap();

    queue.push(RawHandle(9999), HandleKind::SceneNode).unwrap();
    queue.push(good, HandleKind::SceneNode).unwrap();

    assert!(queue.drain(&mut backend).is_err());
    assert!(!backend.is_live(good));
    assert_eq!(queue.released_total(), 1);
}

#[test]
fn test_push_from_other_threads() {
    let mut backend = MockBackend::new();
    let queue = std::sync::Arc::new(ReleaseQueue::new());
    let handles: Vec<RawHandle> = (0..8)
        .map(|_| backend.create_handle(HandleKind::Mesh).unwrap())
        .collect();

    let threads: Vec<_> = handles
        .iter()
        .copied()
        .map(|handle| {
            let queue = queue.clone();
            std::thread::spawn(move || queue.push(handle, HandleKind::Mesh).unwrap())
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(queue.len(), 8);
    assert_eq!(queue.drain(&mut backend).unwrap(), 8);
    assert_eq!(backend.stats().live_handles, 0);
}
