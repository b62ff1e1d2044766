//! SQLite schema for the local store.

/// Complete local store schema.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    age INTEGER NOT NULL CHECK (age > 0),
    gender TEXT NOT NULL CHECK (gender IN ('M', 'F', 'O')),
    phone TEXT NOT NULL UNIQUE,
    address TEXT NOT NULL,
    id_proof TEXT,
    created_at TEXT NOT NULL                     -- RFC 3339, UTC, microseconds
);

CREATE INDEX IF NOT EXISTS idx_patients_created_at ON patients(created_at);

-- ============================================================================
-- Staff
-- ============================================================================

CREATE TABLE IF NOT EXISTS doctors (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    email TEXT,
    consultation_fee TEXT,                       -- decimal string
    is_active INTEGER NOT NULL DEFAULT 1
);

-- ============================================================================
-- Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    doctor_id TEXT REFERENCES doctors(id),
    assigned_role TEXT NOT NULL CHECK (assigned_role IN ('DOCTOR', 'LAB', 'CASUALTY')),
    status TEXT NOT NULL DEFAULT 'OPEN',
    vitals TEXT NOT NULL DEFAULT '{}',           -- JSON object {temp, bp, pulse, weight}
    diagnosis TEXT,
    prescription TEXT,                           -- JSON object medicine -> dosage
    created_at TEXT NOT NULL,
    CHECK ((assigned_role = 'DOCTOR') = (doctor_id IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON visits(patient_id);
CREATE INDEX IF NOT EXISTS idx_visits_status ON visits(status);
CREATE INDEX IF NOT EXISTS idx_visits_created_at ON visits(created_at);

-- ============================================================================
-- Invoices
-- ============================================================================

CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    visit_id TEXT REFERENCES visits(id),
    patient_id TEXT REFERENCES patients(id),
    total_amount TEXT NOT NULL,                  -- decimal string
    payment_status TEXT NOT NULL DEFAULT 'PENDING' CHECK (payment_status IN ('PENDING', 'PAID')),
    item_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoices_patient ON invoices(patient_id);
CREATE INDEX IF NOT EXISTS idx_invoices_created_at ON invoices(created_at);

-- Payment never moves back from PAID
CREATE TRIGGER IF NOT EXISTS invoices_payment_monotonic
BEFORE UPDATE OF payment_status ON invoices
WHEN old.payment_status = 'PAID' AND new.payment_status <> 'PAID'
BEGIN
    SELECT RAISE(ABORT, 'payment status cannot move from PAID');
END;
"#;
