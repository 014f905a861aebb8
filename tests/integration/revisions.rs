//! Each built-in revision applied to a miniature copy of the web app it was
//! written for. Expected texts are spelled out in full so a table edit that
//! changes output shows up as a readable diff.

use lint_patcher::config::{
    apply_patches, builtin_revisions, check_patches, Mode, PatchResult, Revision,
};
use lint_patcher::lint::{apply_housekeeping, FileAction};
use lint_patcher::WorkspaceGuard;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn revision(name: &str) -> Revision {
    builtin_revisions()
        .unwrap()
        .into_iter()
        .find(|r| r.name == name)
        .unwrap()
}

fn workspace_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "name": "antevus-app", "version": "0.1.0" }"#,
    )
    .unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    dir
}

/// Apply a revision's patches and return results keyed by patch id.
fn apply(dir: &Path, revision: &Revision) -> HashMap<String, PatchResult> {
    let guard = WorkspaceGuard::new(dir).unwrap();
    apply_patches(&revision.config, &guard, "0.1.0")
        .into_iter()
        .map(|(id, result)| (id, result.unwrap()))
        .collect()
}

fn read(dir: &Path, path: &str) -> String {
    fs::read_to_string(dir.join(path)).unwrap()
}

const ASSISTANT_PAGE: &str = "src/app/(dashboard)/assistant/page.tsx";

#[test]
fn initial_revision_fixes_assistant_page() {
    let dir = workspace_with(&[(
        ASSISTANT_PAGE,
        r#"'use client'

import { useState } from 'react'
import { format } from 'date-fns'

export default function AssistantPage() {
  const items: any[] = []
  const onProtocol = (e: CustomEvent) => {
    const [threadId, messageId] = e.detail as any;
  }
  try {
    load()
  } catch (e: any) {
    console.error(e)
  }
  setMessages(prev => (prev as any).concat(items))
}
"#,
    )]);

    let results = apply(dir.path(), &revision("01-initial"));
    assert!(matches!(
        results["assistant-page"],
        PatchResult::Fixed { matches: 5, .. }
    ));

    assert_eq!(
        read(dir.path(), ASSISTANT_PAGE),
        r#"'use client'

import { useState } from 'react'

export default function AssistantPage() {
  const items: unknown[] = []
  const onProtocol = (e: CustomEvent) => {
    const [_threadId, _messageId] = e.detail as [string, string];
  }
  try {
    load()
  } catch (e: unknown) {
    console.error(e)
  }
  setMessages(prev => (prev as Message[]).concat(items))
}
"#
    );
}

#[test]
fn initial_revision_removes_unused_function() {
    let path = "src/lib/security/auth-manager.ts";
    let dir = workspace_with(&[(
        path,
        "export function getUser() {\n  return null\n}\n\nfunction validateProductionConfig() {\n  if (!process.env.SECRET) {\n    throw new Error('missing')\n  }\n}\n\nexport const x = 1\n",
    )]);

    apply(dir.path(), &revision("01-initial"));

    assert_eq!(
        read(dir.path(), path),
        "export function getUser() {\n  return null\n}\n\n\n\nexport const x = 1\n"
    );
}

#[test]
fn initial_revision_fixes_session_context() {
    let path = "src/contexts/supabase-session-context.tsx";
    let dir = workspace_with(&[(
        path,
        r#"import { signIn, signUp, signOut, getCurrentUser, getSession } from '@/lib/auth'
import { UserRole } from '@/types/roles'

export function Provider() {
  const { session, user } = useAuth()
  useEffect(() => {
    const { data, error } = supabase.auth.onAuthStateChange(cb)
  }, [])
}
"#,
    )]);

    apply(dir.path(), &revision("01-initial"));

    assert_eq!(
        read(dir.path(), path),
        r#"import { signIn, signUp, signOut, getSession } from '@/lib/auth'

export function Provider() {
  const { user } = useAuth()
  useEffect(() => {
    const { data } = supabase.auth.onAuthStateChange(cb)
  }, [supabase.auth])
}
"#
    );
}

#[test]
fn initial_revision_drops_unused_state_and_types_tooltip() {
    let path = "src/components/reports/ReportPreview.tsx";
    let dir = workspace_with(&[(
        path,
        r#"export function ReportPreview() {
  const [selectedInstruments, setSelectedInstruments] = useState<string[]>([]);
  const [tab, setTab] = useState('summary');
  const CustomTooltip = ({ active, payload, label }: any) => (
    <div>{payload.map((entry: any, index: number) => <p key={index}>{entry.name}</p>)}</div>
  );
  return <Pie label={(props: any) => props.percent} />;
}
"#,
    )]);

    apply(dir.path(), &revision("01-initial"));

    assert_eq!(
        read(dir.path(), path),
        r#"export function ReportPreview() {
  const [tab, setTab] = useState('summary');
  const CustomTooltip = ({ active, payload, label }: { active?: boolean; payload?: Array<{ color: string; name: string; value: number }>; label?: string }) => (
    <div>{payload.map((entry, index: number) => <p key={index}>{entry.name}</p>)}</div>
  );
  return <Pie label={(props: { percent: number }) => props.percent} />;
}
"#
    );
}

#[test]
fn initial_revision_rewrites_recharts_import() {
    let path = "src/app/runs/[id]/page.tsx";
    let dir = workspace_with(&[(
        path,
        "import {\n  LineChart,\n  Line,\n  BarChart,\n  Bar,\n  ResponsiveContainer\n} from 'recharts'\nimport { useState } from 'react'\n",
    )]);

    apply(dir.path(), &revision("01-initial"));

    assert_eq!(
        read(dir.path(), path),
        "import {\n  LineChart,\n  Line,\n  XAxis,\n  YAxis,\n  CartesianGrid,\n  Tooltip,\n  ResponsiveContainer\n} from 'recharts'\nimport { useState } from 'react'\n"
    );
}

#[test]
fn initial_revision_targets_tsx_schedule_route() {
    // The first pass pointed at route.tsx; the handler actually lives in route.ts.
    let path = "src/app/api/reports/schedule/route.ts";
    let original = "const mockScheduledReports: any[] = []\n";
    let dir = workspace_with(&[(path, original)]);

    let results = apply(dir.path(), &revision("01-initial"));

    assert!(matches!(
        &results["reports-schedule-route"],
        PatchResult::NotFound { file } if file.ends_with("route.tsx")
    ));
    assert_eq!(read(dir.path(), path), original);

    let results = apply(dir.path(), &revision("02-followup"));
    assert!(matches!(
        results["reports-schedule-route"],
        PatchResult::Fixed { .. }
    ));
    assert_eq!(
        read(dir.path(), path),
        "const mockScheduledReports: unknown[] = []\n"
    );
}

#[test]
fn followup_revision_declares_window_type() {
    let dir = workspace_with(&[(
        ASSISTANT_PAGE,
        r#"  const handleSubmit = async (e: React.FormEvent) => {
    e.preventDefault()
    const originalInput = input.trim()
    if ((window as any).__pendingProtocol) {
      const { protocolId, threadId, messageId } = (window as any).__pendingProtocol
      run(protocolId)
    }
  }
"#,
    )]);

    apply(dir.path(), &revision("02-followup"));

    assert_eq!(
        read(dir.path(), ASSISTANT_PAGE),
        r#"  const handleSubmit = async (e: React.FormEvent) => {
    e.preventDefault()
    const originalInput = input.trim()

    // Type for window with protocol
    interface WindowWithProtocol extends Window {
      __pendingProtocol?: { protocolId: string; threadId: string; messageId: string };
    }
    if ((window as unknown as WindowWithProtocol).__pendingProtocol) {
      const { protocolId } = (window as unknown as WindowWithProtocol).__pendingProtocol
      run(protocolId)
    }
  }
"#
    );
}

#[test]
fn followup_revision_adds_missing_imports() {
    let path = "src/components/reports/ReportPlanCard.tsx";
    let dir = workspace_with(&[(
        path,
        "import { CalendarIcon, ChartBarIcon, BeakerIcon, ClockIcon } from '@heroicons/react/24/outline'\nimport type { ReportPlan } from '@/types/reports'\n\nexport function ReportPlanCard() {}\n",
    )]);

    apply(dir.path(), &revision("02-followup"));

    assert_eq!(
        read(dir.path(), path),
        "import { CalendarIcon, ChartBarIcon, BeakerIcon, ClockIcon, ChartPieIcon, FlagIcon, EnvelopeIcon } from '@heroicons/react/24/outline'\nimport type { ReportPlan } from '@/types/reports'\nimport { Card, CardHeader, CardContent, CardFooter } from '@/components/ui/card'\nimport { Badge } from '@/components/ui/badge'\nimport { Button } from '@/components/ui/button'\n\nexport function ReportPlanCard() {}\n"
    );
}

#[test]
fn followup_revision_prefixes_unused_parameters() {
    let path = "src/app/api/integrations/[id]/credentials/route.ts";
    let dir = workspace_with(&[(
        path,
        "export async function DELETE(req: NextRequest) {\n  return NextResponse.json({ ok: true })\n}\n\nfunction audit(action: string, userId: string, user: User) {\n  return action\n}\n",
    )]);

    apply(dir.path(), &revision("02-followup"));

    assert_eq!(
        read(dir.path(), path),
        "export async function DELETE(_req: NextRequest) {\n  return NextResponse.json({ ok: true })\n}\n\nfunction audit(action: string, _userId: string, _user: User) {\n  return action\n}\n"
    );
}

#[test]
fn followup_revision_writes_eslintignore() {
    let dir = workspace_with(&[]);
    let guard = WorkspaceGuard::new(dir.path()).unwrap();

    let actions = apply_housekeeping(&revision("02-followup").config, &guard, "0.1.0", Mode::Apply);
    assert_eq!(actions.len(), 1);
    assert!(matches!(actions[0], Ok(FileAction::Written { .. })));
    assert_eq!(
        read(dir.path(), ".eslintignore"),
        "scripts/\ntest-credential-security.js\n"
    );
}

#[test]
fn final_revision_types_chat_context() {
    let path = "src/contexts/chat-context.tsx";
    let dir = workspace_with(&[(
        path,
        r#"  } catch (error) {
    if (error?.status === 401) {
      setError(error?.message)
    }
  }
  // eslint-disable-next-line @typescript-eslint/no-explicit-any
  const parsedThreads = result.threads.map((thread: unknown) => ({
    ...thread,
    messages: (thread as { messages: unknown[] }).messages.map((msg: unknown) => ({
      ...msg,
    })),
  }))
"#,
    )]);

    apply(dir.path(), &revision("03-final"));

    assert_eq!(
        read(dir.path(), path),
        r#"  } catch (error) {
    if ((error as { status?: number })?.status === 401) {
      setError((error as { message?: string })?.message)
    }
  }
    const parsedThreads = result.threads.map((thread: { id: string; title: string; messages: Array<{ id: string }> }) => ({
    ...thread,
    messages: thread.messages.map((msg: { id: string }) => ({
      ...msg,
    })),
  }))
"#
    );
}

#[test]
fn final_revision_replaces_legacy_eslint_config() {
    let dir = workspace_with(&[
        (".eslintrc.json", "{ \"extends\": \"next/core-web-vitals\" }\n"),
        (".eslintignore", "scripts/\n"),
    ]);
    let guard = WorkspaceGuard::new(dir.path()).unwrap();
    let final_revision = revision("03-final");

    let actions: Vec<_> = apply_housekeeping(&final_revision.config, &guard, "0.1.0", Mode::Apply)
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert!(matches!(actions[0], FileAction::Written { .. }));
    assert!(matches!(actions[1], FileAction::Removed { .. }));
    assert!(matches!(actions[2], FileAction::Removed { .. }));

    let written = read(dir.path(), "eslint.config.mjs");
    assert_eq!(written, final_revision.config.config_files[0].contents);
    assert!(written.starts_with("import { FlatCompat } from '@eslint/eslintrc';\n"));
    assert!(written.contains("argsIgnorePattern: '^_'"));
    assert!(written.contains("ignores: ['scripts/**', 'test-*.js', '*.js', 'fix_*.py']"));
    assert!(written.ends_with("export default config;\n"));

    assert!(!dir.path().join(".eslintrc.json").exists());
    assert!(!dir.path().join(".eslintignore").exists());
}

#[test]
fn final_revision_is_idempotent() {
    let path = "src/lib/security/xss-protection.ts";
    let dir = workspace_with(&[(path, "  return String(input)\n")]);
    let final_revision = revision("03-final");

    let first = apply(dir.path(), &final_revision);
    assert!(matches!(first["xss-protection"], PatchResult::Fixed { .. }));
    let after_first = read(dir.path(), path);
    assert_eq!(after_first, "  return String(input as string | number | boolean)\n");

    let guard = WorkspaceGuard::new(dir.path()).unwrap();
    let second = check_patches(&final_revision.config, &guard, "0.1.0");
    assert!(second
        .iter()
        .all(|(_, r)| !matches!(r, Ok(PatchResult::Fixed { .. }))));
    assert_eq!(read(dir.path(), path), after_first);
}
