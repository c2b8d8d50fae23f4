use criterion::{criterion_group, criterion_main, BatchSize, Criterion, black_box};

use glam::IVec3;

use voxedit::core::config::HistoryConfig;
use voxedit::voxel::edit::{BulkVoxelEditCommand, HistoryManager, StateSnapshot, VoxelEditCommand};
use voxedit::voxel::{Resolution, VoxelDataStore};

/// 50x50 floor of 4cm voxels with a few coarse blocks stacked on top
fn populated_store() -> VoxelDataStore {
    let mut store = VoxelDataStore::new();
    for x in 0..50 {
        for z in 0..50 {
            store.set_voxel(IVec3::new(x * 4, 0, z * 4), Resolution::Cm4, true);
        }
    }
    for i in 0..3 {
        store.set_voxel(IVec3::new(i * 64, 64, 0), Resolution::Cm64, true);
    }
    store
}

fn bench_would_overlap(c: &mut Criterion) {
    let store = populated_store();

    c.bench_function("would_overlap_fine_into_coarse", |b| {
        b.iter(|| store.would_overlap(black_box(IVec3::new(70, 70, 10)), black_box(Resolution::Cm1)));
    });

    c.bench_function("would_overlap_coarse_over_floor", |b| {
        b.iter(|| store.would_overlap(black_box(IVec3::new(0, 0, 0)), black_box(Resolution::Cm128)));
    });

    c.bench_function("would_overlap_empty_space", |b| {
        b.iter(|| store.would_overlap(black_box(IVec3::new(-200, 100, -200)), black_box(Resolution::Cm8)));
    });
}

fn bench_history_execute_undo(c: &mut Criterion) {
    c.bench_function("history_execute_100", |b| {
        b.iter_batched(
            || (VoxelDataStore::new(), HistoryManager::new(&HistoryConfig::default())),
            |(mut store, mut history)| {
                for i in 0..100 {
                    let cmd = VoxelEditCommand::new(&store, IVec3::new(i * 2, 0, 0), Resolution::Cm2, true);
                    history.execute_command(cmd, &mut store).ok();
                }
                black_box(history.undo_len())
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("history_undo_redo_cycle", |b| {
        let mut store = VoxelDataStore::new();
        let mut history = HistoryManager::new(&HistoryConfig::default());
        for i in 0..50 {
            let cmd = VoxelEditCommand::new(&store, IVec3::new(i * 2, 0, 0), Resolution::Cm2, true);
            history.execute_command(cmd, &mut store).ok();
        }

        b.iter(|| {
            while history.undo(&mut store).unwrap_or(false) {}
            while history.redo(&mut store).unwrap_or(false) {}
            black_box(store.total_voxel_count())
        });
    });
}

fn bench_bulk_compression(c: &mut Criterion) {
    let store = VoxelDataStore::new();
    let mut bulk = BulkVoxelEditCommand::new(&store, "Stroke");
    for x in 0..100 {
        for z in 0..40 {
            bulk.add_change(IVec3::new(x, 0, z), Resolution::Cm1, false, true);
        }
    }

    c.bench_function("bulk_compress_4000", |b| {
        b.iter_batched(
            || bulk.clone(),
            |mut cmd| {
                cmd.compress().ok();
                black_box(cmd.memory_usage())
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_snapshot(c: &mut Criterion) {
    let store = populated_store();

    c.bench_function("snapshot_capture_2500", |b| {
        b.iter(|| black_box(StateSnapshot::capture(black_box(&store))));
    });

    let snapshot = StateSnapshot::capture(&store);
    c.bench_function("snapshot_restore_from_empty", |b| {
        b.iter_batched(
            VoxelDataStore::new,
            |mut target| {
                snapshot.restore(&mut target).ok();
                black_box(target.total_voxel_count())
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_would_overlap,
    bench_history_execute_undo,
    bench_bulk_compression,
    bench_snapshot,
);
criterion_main!(benches);
