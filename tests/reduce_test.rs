use blocksum::{parallel_accumulate, parallel_reduce_with, BlockPlan, ReduceError, SequenceView};

#[test]
fn test_sum_of_one_to_a_million_matches_serial() {
    let data: Vec<i64> = (1..=1_000_000).collect();
    let expected: i64 = data.iter().sum();

    for workers in [1, 2, 3, 8, 33, 1000] {
        let total = parallel_accumulate(SequenceView::full(&data), 0, workers).unwrap();
        assert_eq!(total, expected, "workers = {}", workers);
    }
}

#[test]
fn test_repeated_calls_keep_no_state() {
    let data: Vec<u32> = vec![1; 4096];
    for _ in 0..3 {
        for workers in 1..=16 {
            let total = parallel_accumulate(SequenceView::full(&data), 10, workers).unwrap();
            assert_eq!(total, 4106);
        }
    }
}

#[test]
fn test_floating_point_grouping_is_deterministic() {
    let data: Vec<f64> = (0..10_000).map(|i| 1.0 / (i as f64 + 1.0)).collect();
    for workers in [1, 4, 7] {
        let first = parallel_accumulate(SequenceView::full(&data), 0.0, workers).unwrap();
        let second = parallel_accumulate(SequenceView::full(&data), 0.0, workers).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }
}

#[test]
fn test_reducer_sees_planned_blocks() {
    let data: Vec<i64> = (1..=10).collect();
    let plan = BlockPlan::new(0, data.len(), 4).unwrap();
    let planned: Vec<_> = plan.blocks().collect();

    let total = parallel_reduce_with(SequenceView::full(&data), 0, 4, |block, slice| {
        assert_eq!(*block, planned[block.index]);
        assert_eq!(slice.len(), block.len());
        slice.iter().sum()
    })
    .unwrap();
    assert_eq!(total, 55);
}

#[test]
fn test_error_messages() {
    let data: Vec<i64> = (1..=10).collect();

    let err = parallel_accumulate(SequenceView::full(&data), 0, 0).unwrap_err();
    assert!(matches!(err, ReduceError::InvalidArgument(_)));
    assert_eq!(err.to_string(), "invalid argument: worker count must be at least 1");

    let err = parallel_reduce_with(SequenceView::full(&data), 0, 2, |block, _| {
        if block.index == 0 {
            panic!("boom");
        }
        0
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "worker 0 failed on block 0..5: boom");
}
