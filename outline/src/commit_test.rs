use std::sync::Mutex;

use super::*;
use crate::drag::DragHandle;
use crate::model::{ChapterData, CourseStructure, LessonData};

// =============================================================================
// MockTransport
// =============================================================================

struct MockTransport {
    reply: Result<ApiResponse, String>,
    sent: Mutex<Vec<ReorderRequest>>,
}

impl MockTransport {
    fn replying(reply: ApiResponse) -> Self {
        Self { reply: Ok(reply), sent: Mutex::new(Vec::new()) }
    }

    fn failing(reason: &str) -> Self {
        Self { reply: Err(reason.to_owned()), sent: Mutex::new(Vec::new()) }
    }

    fn sent(&self) -> Vec<ReorderRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommitTransport for MockTransport {
    async fn send(&self, request: &ReorderRequest) -> Result<ApiResponse, TransportError> {
        self.sent.lock().unwrap().push(request.clone());
        self.reply.clone().map_err(TransportError)
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

fn course() -> CourseStructure {
    let lessons = |titles: &[&str]| {
        titles
            .iter()
            .zip(1..)
            .map(|(title, position)| LessonData { id: Uuid::new_v4(), title: (*title).into(), position })
            .collect::<Vec<_>>()
    };
    CourseStructure {
        id: Uuid::new_v4(),
        title: "Course".into(),
        chapters: vec![
            ChapterData { id: Uuid::new_v4(), title: "A".into(), position: 1, lessons: lessons(&["L1", "L2", "L3"]) },
            ChapterData { id: Uuid::new_v4(), title: "B".into(), position: 2, lessons: lessons(&["M1", "M2"]) },
            ChapterData { id: Uuid::new_v4(), title: "C".into(), position: 3, lessons: Vec::new() },
        ],
    }
}

fn chapter_titles(outline: &Outline) -> Vec<String> {
    outline.chapters().iter().map(|c| c.title.clone()).collect()
}

fn move_chapter(outline: &Outline, from: usize, to: usize) -> DragEvent {
    let chapters = outline.chapters();
    DragEvent {
        active: DragHandle::chapter(chapters[from].id),
        over: Some(DragHandle::chapter(chapters[to].id)),
    }
}

// =============================================================================
// apply_drag / settle
// =============================================================================

#[test]
fn apply_drag_builds_full_scope_payload() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let (a, b, c) = (data.chapters[0].id, data.chapters[1].id, data.chapters[2].id);

    let pending = outline.apply_drag(&move_chapter(&outline, 2, 0)).unwrap().unwrap();

    assert_eq!(chapter_titles(&outline), vec!["C", "A", "B"]);
    assert!(outline.is_pending());
    assert_eq!(
        pending.request(),
        &ReorderRequest::Chapters {
            course_id: data.id,
            items: vec![
                PositionUpdate { id: c, position: 1 },
                PositionUpdate { id: a, position: 2 },
                PositionUpdate { id: b, position: 3 },
            ],
        }
    );
}

#[test]
fn confirmed_commit_keeps_optimistic_tree() {
    let mut outline = Outline::from_structure(&course());
    let pending = outline.apply_drag(&move_chapter(&outline, 0, 1)).unwrap().unwrap();

    let settled = outline.settle(pending, &ApiResponse::success("Chapters reordered successfully"));
    assert_eq!(settled, Settlement::Confirmed { message: "Chapters reordered successfully".into() });
    assert_eq!(chapter_titles(&outline), vec!["B", "A", "C"]);
    assert!(!outline.is_pending());
    assert!(!outline.needs_refresh());
}

#[test]
fn rejected_commit_restores_pre_drag_tree() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let before = outline.chapters().to_vec();
    let pending = outline.apply_drag(&move_chapter(&outline, 0, 2)).unwrap().unwrap();

    let settled = outline.settle(pending, &ApiResponse::error("Invalid chapter IDs provided"));
    assert_eq!(settled, Settlement::RolledBack { message: "Invalid chapter IDs provided".into() });
    assert_eq!(outline.chapters(), before.as_slice());
}

#[test]
fn rejected_move_leaves_tree_and_issues_nothing() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let before = outline.chapters().to_vec();
    let event = DragEvent {
        active: DragHandle::lesson(data.chapters[0].lessons[0].id, data.chapters[0].id),
        over: Some(DragHandle::lesson(data.chapters[1].lessons[0].id, data.chapters[1].id)),
    };

    assert_eq!(outline.apply_drag(&event).unwrap_err(), MoveError::CrossChapterLesson);
    assert_eq!(outline.chapters(), before.as_slice());
    assert!(!outline.is_pending());
}

#[test]
fn stale_commit_is_superseded_by_newer_one() {
    let mut outline = Outline::from_structure(&course());
    let first = outline.apply_drag(&move_chapter(&outline, 0, 1)).unwrap().unwrap();
    let second = outline.apply_drag(&move_chapter(&outline, 2, 0)).unwrap().unwrap();
    assert!(second.ticket() > first.ticket());
    let expected = chapter_titles(&outline);

    // The first commit fails but must not undo the second drag.
    assert_eq!(outline.settle(first, &ApiResponse::error("Failed to reorder chapters")), Settlement::Superseded);
    assert_eq!(chapter_titles(&outline), expected);
    assert!(outline.needs_refresh());

    assert!(matches!(outline.settle(second, &ApiResponse::success("ok")), Settlement::Confirmed { .. }));
}

#[test]
fn late_success_after_newer_settled_requests_refresh() {
    let mut outline = Outline::from_structure(&course());
    let first = outline.apply_drag(&move_chapter(&outline, 0, 1)).unwrap().unwrap();
    let second = outline.apply_drag(&move_chapter(&outline, 2, 0)).unwrap().unwrap();

    assert!(matches!(outline.settle(second, &ApiResponse::success("ok")), Settlement::Confirmed { .. }));
    assert!(!outline.needs_refresh());

    assert_eq!(outline.settle(first, &ApiResponse::success("ok")), Settlement::Superseded);
    assert!(outline.needs_refresh());
}

#[test]
fn in_order_success_of_older_commit_needs_no_refresh() {
    let mut outline = Outline::from_structure(&course());
    let first = outline.apply_drag(&move_chapter(&outline, 0, 1)).unwrap().unwrap();
    let second = outline.apply_drag(&move_chapter(&outline, 2, 0)).unwrap().unwrap();

    assert_eq!(outline.settle(first, &ApiResponse::success("ok")), Settlement::Superseded);
    assert!(matches!(outline.settle(second, &ApiResponse::success("ok")), Settlement::Confirmed { .. }));
    assert!(!outline.needs_refresh());
}

#[test]
fn reinitialize_detaches_in_flight_commits() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let pending = outline.apply_drag(&move_chapter(&outline, 0, 1)).unwrap().unwrap();

    outline.initialize(&data);
    assert!(!outline.is_pending());

    assert_eq!(outline.settle(pending, &ApiResponse::success("ok")), Settlement::Superseded);
    assert_eq!(chapter_titles(&outline), vec!["A", "B", "C"]);
    // The refresh may predate the commit landing, so the tree asks for another.
    assert!(outline.needs_refresh());
}

#[test]
fn commit_after_refresh_settles_normally() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let detached = outline.apply_drag(&move_chapter(&outline, 0, 1)).unwrap().unwrap();
    outline.initialize(&data);

    let fresh = outline.apply_drag(&move_chapter(&outline, 2, 0)).unwrap().unwrap();
    assert!(matches!(outline.settle(fresh, &ApiResponse::success("ok")), Settlement::Confirmed { .. }));
    assert!(!outline.needs_refresh());

    assert_eq!(outline.settle(detached, &ApiResponse::success("ok")), Settlement::Superseded);
    assert!(outline.needs_refresh());
}

// =============================================================================
// drag_and_commit
// =============================================================================

#[tokio::test]
async fn drag_and_commit_sends_lesson_payload() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let chapter = &data.chapters[0];
    let (l1, l2, l3) = (chapter.lessons[0].id, chapter.lessons[1].id, chapter.lessons[2].id);
    let transport = MockTransport::replying(ApiResponse::success("Lessons reordered successfully"));

    let event = DragEvent {
        active: DragHandle::lesson(l1, chapter.id),
        over: Some(DragHandle::lesson(l3, chapter.id)),
    };
    let settled = outline.drag_and_commit(&event, &transport).await.unwrap();

    assert!(matches!(settled, Some(Settlement::Confirmed { .. })));
    assert_eq!(
        transport.sent(),
        vec![ReorderRequest::Lessons {
            course_id: data.id,
            chapter_id: chapter.id,
            items: vec![
                PositionUpdate { id: l2, position: 1 },
                PositionUpdate { id: l3, position: 2 },
                PositionUpdate { id: l1, position: 3 },
            ],
        }]
    );
}

#[tokio::test]
async fn drag_and_commit_rolls_back_on_transport_failure() {
    let mut outline = Outline::from_structure(&course());
    let before = outline.chapters().to_vec();
    let transport = MockTransport::failing("connection reset");

    let event = move_chapter(&outline, 1, 0);
    let settled = outline.drag_and_commit(&event, &transport).await.unwrap();

    assert_eq!(settled, Some(Settlement::RolledBack { message: "Failed to reorder chapters".into() }));
    assert_eq!(outline.chapters(), before.as_slice());
}

#[tokio::test]
async fn cross_chapter_drag_never_reaches_transport() {
    let data = course();
    let mut outline = Outline::from_structure(&data);
    let transport = MockTransport::replying(ApiResponse::success("ok"));
    let event = DragEvent {
        active: DragHandle::lesson(data.chapters[1].lessons[0].id, data.chapters[1].id),
        over: Some(DragHandle::lesson(data.chapters[0].lessons[0].id, data.chapters[0].id)),
    };

    let result = outline.drag_and_commit(&event, &transport).await;
    assert_eq!(result, Err(MoveError::CrossChapterLesson));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn noop_drag_sends_nothing() {
    let mut outline = Outline::from_structure(&course());
    let transport = MockTransport::replying(ApiResponse::success("ok"));
    let id = outline.chapters()[0].id;
    let event = DragEvent { active: DragHandle::chapter(id), over: Some(DragHandle::chapter(id)) };

    assert_eq!(outline.drag_and_commit(&event, &transport).await, Ok(None));
    assert!(transport.sent().is_empty());
}
