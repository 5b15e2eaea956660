pub(super) const ROOT_LONG_ABOUT: &str = "\
Content-hash build stamps driven by compiler depfiles

depstamp answers one question for a build driver: have the inputs of this build
action changed since it last succeeded? It records a stamp per action holding
the build mode, the target platform and the SHA-256 of every input file, and
compares a fresh fingerprint against that stamp on the next run.

CORE CONCEPTS:

  Depfiles:
    A one-line manifest emitted by a compiler, of the form
    `outputs : inputs`. Paths are space separated; a backslash escapes the
    next character, so `my\\ file.dart` is a single path containing a space.

  Stamps:
    A TOML file per build action. Stamps carry the depstamp version that wrote
    them; a stamp from any other version is never trusted and simply makes the
    action stale.

  Freshness:
    An action is fresh when its stamp exists, was written by this version, and
    matches the current build mode, target platform and input contents
    exactly. Timestamps are never consulted.

TYPICAL WORKFLOW:

  1. Before building, ask whether the action is fresh:
     $ depstamp check --stamp out/app.stamp --mode release --platform android \\
         --depfile out/app.d

  2. If it exits 1, run the build, then record the new stamp:
     $ depstamp stamp --stamp out/app.stamp --mode release --platform android \\
         --depfile out/app.d
";

pub(super) const ROOT_AFTER_HELP: &str = "\
EXIT STATUS:
  0    Success, or the action is fresh (check)
  1    The action is stale and must be rebuilt (check)
  255  Any error: unreadable or malformed depfile, missing input files, I/O errors

EXAMPLES:

  # List what a compiler says an output depends on
  $ depstamp deps out/app.d

  # Rebuild only when needed
  $ depstamp check --stamp app.stamp --mode debug a.dart b.dart || build.sh

  # Preview a stamp without writing it
  $ depstamp stamp --stamp app.stamp --mode debug --dry-run a.dart b.dart

  # Inspect a stamp
  $ depstamp -C out show app.stamp
";
