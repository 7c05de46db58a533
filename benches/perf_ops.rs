use std::fs;

use criterion::{Criterion, criterion_group, criterion_main};
use guarded_vfs::diff::unified_diff;
use guarded_vfs::lines::replace_lines;
use guarded_vfs::{Context, Preset, ReadRequest, WriteOperation, WriteRequest, fuzzy};

struct BenchFixture {
    _tempdir: tempfile::TempDir,
    ctx: Context,
    large: String,
    large_edited: String,
    paths: Vec<String>,
}

fn setup_fixture() -> BenchFixture {
    let tempdir = tempfile::tempdir().expect("tempdir");

    let mut large = String::with_capacity(256 * 1024);
    for i in 0..8_000 {
        large.push_str(&format!("line-{i} normal text and maybe needle-{i}\n"));
    }
    fs::write(tempdir.path().join("large.txt"), &large).expect("write large file");

    let mut paths = Vec::new();
    for section in 0..20 {
        let dir = tempdir.path().join(format!("notes/section-{section}"));
        fs::create_dir_all(&dir).expect("mkdir notes");
        for i in 0..30 {
            let text = if i % 8 == 0 {
                "# Title\n- [ ] needle task\nSee [[other]] #tag\n"
            } else {
                "# Title\nplain content\n"
            };
            fs::write(dir.join(format!("note-{i}.md")), text).expect("write note");
            paths.push(format!("notes/section-{section}/note-{i}.md"));
        }
    }
    fs::create_dir_all(tempdir.path().join("node_modules/pkg")).expect("mkdir vendored");
    fs::write(tempdir.path().join("node_modules/pkg/index.js"), "needle\n").expect("write js");

    let ctx = Context::with_root(tempdir.path()).expect("ctx");
    let large_edited = replace_lines(&large, 4_000, 4_010, "edited\n");

    BenchFixture {
        _tempdir: tempdir,
        ctx,
        large,
        large_edited,
        paths,
    }
}

fn bench_ops(c: &mut Criterion) {
    let fixture = setup_fixture();

    c.bench_function("resolve/nested_path", |b| {
        b.iter(|| {
            fixture
                .ctx
                .resolve("notes/./section-3//note-7.md")
                .expect("resolve")
        });
    });

    c.bench_function("read/large_file_preview", |b| {
        b.iter(|| fixture.ctx.read(ReadRequest::new("large.txt")).expect("read"));
    });

    c.bench_function("read/large_file_range", |b| {
        b.iter(|| {
            let mut request = ReadRequest::new("large.txt");
            request.lines = Some("3000-3500".parse().expect("range"));
            fixture.ctx.read(request).expect("read")
        });
    });

    c.bench_function("read/directory_listing", |b| {
        b.iter(|| {
            let mut request = ReadRequest::new("notes");
            request.depth = Some(2);
            fixture.ctx.read(request).expect("list")
        });
    });

    c.bench_function("search/literal_across_tree", |b| {
        b.iter(|| {
            let mut request = ReadRequest::new(".");
            request.pattern = Some("needle".to_string());
            fixture.ctx.read(request).expect("search")
        });
    });

    c.bench_function("search/tasks_preset", |b| {
        b.iter(|| {
            let mut request = ReadRequest::new("notes");
            request.preset = Some(Preset::TasksOpen);
            fixture.ctx.read(request).expect("search")
        });
    });

    c.bench_function("find/fuzzy_tree_walk", |b| {
        b.iter(|| {
            let mut request = ReadRequest::new(".");
            request.find = Some("sec3nt7".to_string());
            fixture.ctx.read(request).expect("find")
        });
    });

    c.bench_function("fuzzy/rank_600_paths", |b| {
        b.iter(|| fuzzy::rank("s12note", fixture.paths.clone(), |path| path.as_str(), 50));
    });

    c.bench_function("diff/large_file_middle_edit", |b| {
        b.iter(|| unified_diff("large.txt", &fixture.large, &fixture.large_edited));
    });

    c.bench_function("write/update_dry_run", |b| {
        b.iter(|| {
            let mut request = WriteRequest::new("large.txt", WriteOperation::Update);
            request.action = Some(guarded_vfs::EditAction::Replace);
            request.pattern = Some("needle-7999".to_string());
            request.content = Some("needle-last".to_string());
            request.dry_run = true;
            fixture.ctx.write(request).expect("write")
        });
    });
}

criterion_group!(benches, bench_ops);
criterion_main!(benches);
