use super::*;
use crate::tree::LessonNode;

fn lesson(title: &str, position: i32) -> LessonNode {
    LessonNode { id: Uuid::new_v4(), title: title.into(), position }
}

fn chapter(title: &str, position: i32, lessons: Vec<LessonNode>) -> ChapterNode {
    ChapterNode { id: Uuid::new_v4(), title: title.into(), position, is_open: true, lessons }
}

fn titles(chapters: &[ChapterNode]) -> Vec<&str> {
    chapters.iter().map(|c| c.title.as_str()).collect()
}

fn three_chapters() -> Vec<ChapterNode> {
    vec![
        chapter("A", 1, vec![lesson("L1", 1), lesson("L2", 2), lesson("L3", 3)]),
        chapter("B", 2, vec![lesson("M1", 1)]),
        chapter("C", 3, Vec::new()),
    ]
}

// =============================================================================
// array_move
// =============================================================================

#[test]
fn array_move_forward_and_backward() {
    let mut v = vec![1, 2, 3, 4];
    array_move(&mut v, 0, 2);
    assert_eq!(v, vec![2, 3, 1, 4]);
    array_move(&mut v, 3, 0);
    assert_eq!(v, vec![4, 2, 3, 1]);
}

#[test]
fn array_move_out_of_range_is_ignored() {
    let mut v = vec![1, 2];
    array_move(&mut v, 0, 5);
    assert_eq!(v, vec![1, 2]);
}

// =============================================================================
// no-ops
// =============================================================================

#[test]
fn drop_without_target_is_noop() {
    let tree = three_chapters();
    let event = DragEvent { active: DragHandle::chapter(tree[0].id), over: None };
    assert_eq!(reorder(&tree, &event), Ok(None));
}

#[test]
fn drop_on_self_is_noop() {
    let tree = three_chapters();
    let handle = DragHandle::chapter(tree[1].id);
    let event = DragEvent { active: handle, over: Some(handle) };
    assert_eq!(reorder(&tree, &event), Ok(None));
}

#[test]
fn lesson_over_chapter_handle_is_noop() {
    let tree = three_chapters();
    let event = DragEvent {
        active: DragHandle::lesson(tree[0].lessons[0].id, tree[0].id),
        over: Some(DragHandle::chapter(tree[1].id)),
    };
    assert_eq!(reorder(&tree, &event), Ok(None));
}

// =============================================================================
// chapters
// =============================================================================

#[test]
fn moving_last_chapter_to_front_renumbers_all() {
    let tree = three_chapters();
    let (a, b, c) = (tree[0].id, tree[1].id, tree[2].id);
    let event = DragEvent { active: DragHandle::chapter(c), over: Some(DragHandle::chapter(a)) };

    let reordered = reorder(&tree, &event).unwrap().unwrap();
    assert_eq!(reordered.scope, MovedScope::Chapters);
    assert_eq!(titles(&reordered.chapters), vec!["C", "A", "B"]);
    assert_eq!(reordered.chapters.iter().map(|c| c.position).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(
        reordered.payload(),
        vec![
            PositionUpdate { id: c, position: 1 },
            PositionUpdate { id: a, position: 2 },
            PositionUpdate { id: b, position: 3 },
        ]
    );
}

#[test]
fn chapter_dropped_on_lesson_targets_lessons_chapter() {
    let tree = three_chapters();
    let event = DragEvent {
        active: DragHandle::chapter(tree[0].id),
        over: Some(DragHandle::lesson(tree[1].lessons[0].id, tree[1].id)),
    };

    let reordered = reorder(&tree, &event).unwrap().unwrap();
    assert_eq!(titles(&reordered.chapters), vec!["B", "A", "C"]);
}

#[test]
fn chapter_move_keeps_lessons_attached() {
    let tree = three_chapters();
    let event = DragEvent { active: DragHandle::chapter(tree[0].id), over: Some(DragHandle::chapter(tree[2].id)) };

    let reordered = reorder(&tree, &event).unwrap().unwrap();
    let moved = reordered.chapters.iter().find(|c| c.title == "A").unwrap();
    assert_eq!(moved.position, 3);
    assert_eq!(moved.lessons, tree[0].lessons);
}

#[test]
fn chapter_over_unscoped_target_cannot_determine_chapter() {
    let tree = three_chapters();
    let event = DragEvent {
        active: DragHandle::chapter(tree[0].id),
        over: Some(DragHandle { id: Uuid::new_v4(), scope: None }),
    };
    assert_eq!(reorder(&tree, &event), Err(MoveError::UndeterminedChapter));
}

#[test]
fn unknown_chapter_id_reports_missing_index() {
    let tree = three_chapters();
    let event = DragEvent {
        active: DragHandle::chapter(Uuid::new_v4()),
        over: Some(DragHandle::chapter(tree[0].id)),
    };
    let err = reorder(&tree, &event).unwrap_err();
    assert_eq!(err, MoveError::ChapterIndexNotFound);
    assert_eq!(err.to_string(), "Could not find chapter old/new index for reordering");
}

// =============================================================================
// lessons
// =============================================================================

#[test]
fn lesson_move_renumbers_only_its_chapter() {
    let tree = three_chapters();
    let chapter_id = tree[0].id;
    let (l1, l2, l3) = (tree[0].lessons[0].id, tree[0].lessons[1].id, tree[0].lessons[2].id);
    let event = DragEvent {
        active: DragHandle::lesson(l3, chapter_id),
        over: Some(DragHandle::lesson(l1, chapter_id)),
    };

    let reordered = reorder(&tree, &event).unwrap().unwrap();
    assert_eq!(reordered.scope, MovedScope::Lessons { chapter_id });
    assert_eq!(
        reordered.payload(),
        vec![
            PositionUpdate { id: l3, position: 1 },
            PositionUpdate { id: l1, position: 2 },
            PositionUpdate { id: l2, position: 3 },
        ]
    );
    assert_eq!(reordered.chapters[1..], tree[1..]);
    assert_eq!(titles(&reordered.chapters), titles(&tree));
}

#[test]
fn cross_chapter_lesson_move_is_rejected() {
    let tree = three_chapters();
    let event = DragEvent {
        active: DragHandle::lesson(tree[0].lessons[0].id, tree[0].id),
        over: Some(DragHandle::lesson(tree[1].lessons[0].id, tree[1].id)),
    };
    assert_eq!(reorder(&tree, &event), Err(MoveError::CrossChapterLesson));
}

#[test]
fn lesson_in_unknown_chapter_is_rejected() {
    let tree = three_chapters();
    let ghost_chapter = Uuid::new_v4();
    let event = DragEvent {
        active: DragHandle::lesson(Uuid::new_v4(), ghost_chapter),
        over: Some(DragHandle::lesson(Uuid::new_v4(), ghost_chapter)),
    };
    assert_eq!(reorder(&tree, &event), Err(MoveError::ChapterNotFound));
}

#[test]
fn unknown_lesson_id_reports_missing_index() {
    let tree = three_chapters();
    let chapter_id = tree[0].id;
    let event = DragEvent {
        active: DragHandle::lesson(Uuid::new_v4(), chapter_id),
        over: Some(DragHandle::lesson(tree[0].lessons[0].id, chapter_id)),
    };
    assert_eq!(reorder(&tree, &event), Err(MoveError::LessonIndexNotFound));
}
