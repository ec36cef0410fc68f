//! C launcher generation.
//!
//! The launcher embeds the escaped script, writes it to a fresh `mkstemp` file
//! at run time, runs the interpreter on it via `posix_spawn` with the launcher's
//! own arguments appended, removes the file and exits with the child's status.

use std::path::Path;

use py2exe_contracts::RUNTIME_TEMP_PREFIX;

use crate::escape::{escape_to_string, EscapedLiteral};

/// Generated C source for one launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperSource(String);

impl WrapperSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

const PRELUDE: &str = r#"#define _POSIX_C_SOURCE 200809L

#include <errno.h>
#include <signal.h>
#include <spawn.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include <sys/stat.h>
#include <sys/types.h>
#include <sys/wait.h>
#include <unistd.h>

extern char **environ;

"#;

const BODY: &str = r#"
static char *temp_template(void) {
    const char *dir = getenv("TMPDIR");
    if (dir == NULL || dir[0] == '\0') {
        dir = "/tmp";
    }
    size_t dir_len = strlen(dir);
    while (dir_len > 1 && dir[dir_len - 1] == '/') {
        dir_len--;
    }
    size_t cap = dir_len + sizeof(temp_prefix) + sizeof(script_tag) + sizeof("/_XXXXXX");
    char *path = malloc(cap);
    if (path == NULL) {
        return NULL;
    }
    snprintf(path, cap, "%.*s/%s%s_XXXXXX", (int)dir_len, dir, temp_prefix, script_tag);
    return path;
}

static int write_script(int fd, const char *path) {
    FILE *fp = fdopen(fd, "w");
    if (fp == NULL) {
        fprintf(stderr, "Error opening temporary file %s: %s\n", path, strerror(errno));
        close(fd);
        return -1;
    }
    if (fputs(script_src, fp) == EOF) {
        fprintf(stderr, "Error writing to temporary file %s: %s\n", path, strerror(errno));
        fclose(fp);
        return -1;
    }
    if (fclose(fp) != 0) {
        fprintf(stderr, "Error writing to temporary file %s: %s\n", path, strerror(errno));
        return -1;
    }
    return 0;
}

static int run_interpreter(char *script_path, int argc, char **argv) {
    char **child_argv = calloc((size_t)argc + 2, sizeof(char *));
    if (child_argv == NULL) {
        fprintf(stderr, "Memory allocation failed\n");
        return 1;
    }
    child_argv[0] = (char *)interpreter_path;
    child_argv[1] = script_path;
    for (int i = 1; i < argc; i++) {
        child_argv[i + 1] = argv[i];
    }
    child_argv[argc + 1] = NULL;

    /* Like system(3): the launcher ignores SIGINT/SIGQUIT while the child runs. */
    struct sigaction ignore, old_int, old_quit;
    memset(&ignore, 0, sizeof(ignore));
    ignore.sa_handler = SIG_IGN;
    sigemptyset(&ignore.sa_mask);
    sigaction(SIGINT, &ignore, &old_int);
    sigaction(SIGQUIT, &ignore, &old_quit);

    sigset_t defaults;
    sigemptyset(&defaults);
    sigaddset(&defaults, SIGINT);
    sigaddset(&defaults, SIGQUIT);

    posix_spawnattr_t attr;
    posix_spawnattr_init(&attr);
    posix_spawnattr_setsigdefault(&attr, &defaults);
    posix_spawnattr_setflags(&attr, POSIX_SPAWN_SETSIGDEF);

    fflush(stdout);
    fflush(stderr);

    int code = 1;
    pid_t pid;
    int rc = posix_spawn(&pid, interpreter_path, NULL, &attr, child_argv, environ);
    posix_spawnattr_destroy(&attr);
    if (rc != 0) {
        fprintf(stderr, "Error launching interpreter %s: %s\n", interpreter_path, strerror(rc));
    } else {
        int status = 0;
        pid_t waited;
        do {
            waited = waitpid(pid, &status, 0);
        } while (waited == -1 && errno == EINTR);
        if (waited == -1) {
            fprintf(stderr, "Error waiting for interpreter: %s\n", strerror(errno));
        } else if (WIFEXITED(status)) {
            code = WEXITSTATUS(status);
        } else if (WIFSIGNALED(status)) {
            code = 128 + WTERMSIG(status);
        }
    }

    sigaction(SIGINT, &old_int, NULL);
    sigaction(SIGQUIT, &old_quit, NULL);
    free(child_argv);
    return code;
}

int main(int argc, char **argv) {
    char *temp_path = temp_template();
    if (temp_path == NULL) {
        fprintf(stderr, "Memory allocation failed\n");
        return 1;
    }

    int fd = mkstemp(temp_path);
    if (fd == -1) {
        fprintf(stderr, "Error creating temporary file: %s\n", strerror(errno));
        free(temp_path);
        return 1;
    }

    if (write_script(fd, temp_path) != 0) {
        unlink(temp_path);
        free(temp_path);
        return 1;
    }
    chmod(temp_path, 0755);

    int code = run_interpreter(temp_path, argc, argv);

    unlink(temp_path);
    free(temp_path);
    return code;
}
"#;

/// Byte budget for the script name inside the run-time temp file name; keeps
/// `pyexe_<tag>_XXXXXX` well under `NAME_MAX`.
const SCRIPT_TAG_MAX: usize = 64;

fn script_tag(script_name: &str) -> &str {
    if script_name.len() <= SCRIPT_TAG_MAX {
        return script_name;
    }
    let mut end = SCRIPT_TAG_MAX;
    while !script_name.is_char_boundary(end) {
        end -= 1;
    }
    &script_name[..end]
}

/// Builds the launcher for `script`.
///
/// `script_name` is the script's base file name; it becomes part of the run-time
/// temp file name, truncated to its first 64 bytes. `interpreter` must be absolute.
pub fn generate_wrapper(
    script: &EscapedLiteral,
    script_name: &str,
    interpreter: &Path,
) -> WrapperSource {
    let interpreter = escape_to_string(interpreter.as_os_str().as_encoded_bytes());
    let tag = escape_to_string(script_tag(script_name).as_bytes());

    let mut out = String::with_capacity(PRELUDE.len() + BODY.len() + script.len() + 256);
    out.push_str(PRELUDE);
    out.push_str("static const char script_src[] = \"");
    out.push_str(script.as_str());
    out.push_str("\";\n");
    out.push_str("static const char interpreter_path[] = \"");
    out.push_str(&interpreter);
    out.push_str("\";\n");
    out.push_str("static const char script_tag[] = \"");
    out.push_str(&tag);
    out.push_str("\";\n");
    out.push_str("static const char temp_prefix[] = \"");
    out.push_str(RUNTIME_TEMP_PREFIX);
    out.push_str("\";\n");
    out.push_str(BODY);
    WrapperSource(out)
}
