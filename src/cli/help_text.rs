pub(super) const ROOT_LONG_ABOUT: &str = "\
Verify the filesystem and console effects of a build tool

Buildward runs an external build tool as an opaque subprocess and proves that it
produced exactly the effects you declared: which files were added, removed,
modified or merely touched, what it printed, and how it exited. Anything the
tool did that you did not account for is reported as an unexplained change.

CORE CONCEPTS:

  Snapshot:
    A map from every path under a directory to its content fingerprint
    (SHA-256 of size and bytes) and modification time. Symlinks are recorded
    as links, never followed.

  Diff:
    Two snapshots compared path by path. Each path is added, removed,
    modified (content changed), touched (only the mtime changed) or unchanged.
    Directory entries are dropped; only leaf files count as build artifacts.

  Expectations:
    Every --added/--removed/--modified/--touched pattern consumes exactly one
    matching entry from the diff. --nothing-more then requires that nothing
    is left over, apart from well-known incidental files (gmon.out, *.pyc,
    Windows debug databases, ...).

COMMANDS:

  snapshot
    Print every entry of a directory with kind, size, mtime and fingerprint.

  run
    Snapshot, run the program, snapshot again and check the result.

GLOBAL OPTIONS:

  -C <DIRECTORY>
    Change to directory before operating (like git -C or make -C).

  --config <FILE>
    TOML file with the toolset name, name translation table, benign paths
    and stderr noise filters.

EXAMPLES:

  # Show what a tree looks like right now
  $ buildward snapshot

  # A clean build must produce the object and the executable, nothing else
  $ buildward -C ./test-project run --added 'bin/*/a.o' --added 'bin/*/a' \\
      --nothing-more -- b2 -d0

  # A rebuild must not touch anything
  $ buildward run --nothing-more -- make

For detailed help on any command, use:
  buildward <command> --help
";

pub(super) const SNAPSHOT_LONG_ABOUT: &str = "\
Print a snapshot of a directory tree

Lists every file, directory and symlink under PATH (default: the current
directory), sorted by path, one per line:

  <kind> <size> <mtime> <fingerprint> <path>

where kind is 'f' for files, 'd' for directories, 'l' for symlinks and 's'
for FIFOs, sockets and devices. The fingerprint is abbreviated to its first
12 hex digits.
";

pub(super) const RUN_LONG_ABOUT: &str = "\
Run a program and verify what it changed

The working directory (or a scratch copy of --tree) is snapshotted, PROGRAM is
run to completion inside it, and the tree is snapshotted again. The classified
diff is always printed. Then, in order:

  1. The exit status must equal --status (default 0) unless --any-status.
  2. Every --added/--removed/--modified/--touched pattern must consume one
     matching change. --touched also accepts a modified file, since some
     outputs embed volatile metadata.
  3. No --unchanged pattern may appear anywhere in the diff.
  4. --stdout-lines groups must appear in stdout, in order; --no-stdout-lines
     groups must not. A line consisting of '...' separates groups.
  5. The run must not take longer than --max-duration seconds.
  6. With --nothing-more, no unexplained change may remain after --ignore
     patterns and the benign-path allow-list are applied.

Patterns support shell-style wildcards ('*' also matches '/'). Names go through
the configured name translation, so 'bin/$toolset/debug/a.obj' becomes
'bin/gcc*/debug/a.o' on Unix with the default configuration.

On failure the diagnostics (failure reason, changes, STDOUT, STDERR, failed
command) are printed to stdout. Set DO_DIFF to include a unified diff of
expected and actual text.

EXIT STATUS:

  0    all expectations hold
  1    an expectation failed
  255  the program could not be started, or another error occurred
";
